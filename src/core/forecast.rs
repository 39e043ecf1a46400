use crate::config::StationConfig;
use crate::core::dewpoint::c_to_f;
use crate::core::lookup::LookupTable;
use crate::core::table;
use crate::domain::model::{ForecastPrediction, NwsForecast, NwsPeriod, QuantitativeValue};
use crate::domain::ports::{Pipeline, Storage};
use crate::utils::error::{Result, WxError};
use chrono::{DateTime, Utc};
use reqwest::Client;
use std::time::Duration;

pub const DESCRIPTION_COLUMN: &str = "shortForecast";
pub const ICON_COLUMN: &str = "icon";

/// Result of the transform stage.
#[derive(Debug, Clone)]
pub enum ForecastUpdate {
    /// The stored forecast is as new as (or newer than) the fetched one.
    UpToDate { updated: DateTime<Utc> },
    New(ForecastBatch),
}

#[derive(Debug, Clone)]
pub struct ForecastBatch {
    pub updated: DateTime<Utc>,
    pub predictions: Vec<ForecastPrediction>,
    pub descriptions: LookupTable,
    pub icons: LookupTable,
    pub descriptions_changed: bool,
    pub icons_changed: bool,
}

/// Hourly gridpoint forecast -> FORECAST_PREDICTIONS / DESCRIPTIONS / ICONS CSVs.
pub struct ForecastPipeline<S: Storage> {
    storage: S,
    client: Client,
    endpoint: String,
    user_agent: String,
    from: String,
    timeout: Duration,
    predictions_path: String,
    descriptions_path: String,
    icons_path: String,
}

impl<S: Storage> ForecastPipeline<S> {
    pub fn new(storage: S, config: &StationConfig) -> Self {
        Self {
            storage,
            client: Client::new(),
            endpoint: config.forecast_endpoint(),
            user_agent: config.forecast.user_agent.clone(),
            from: config.forecast.from.clone(),
            timeout: Duration::from_secs(config.forecast.timeout_seconds),
            predictions_path: config.forecast_predictions_path(),
            descriptions_path: config.forecast_descriptions_path(),
            icons_path: config.forecast_icons_path(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn existing_predictions(&self) -> Result<Vec<ForecastPrediction>> {
        table::read_table(&self.storage, &self.predictions_path).await
    }
}

#[async_trait::async_trait]
impl<S: Storage> Pipeline for ForecastPipeline<S> {
    type Raw = NwsForecast;
    type Output = ForecastUpdate;

    async fn extract(&self) -> Result<NwsForecast> {
        tracing::debug!("Requesting forecast from: {}", self.endpoint);

        let response = self
            .client
            .get(&self.endpoint)
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .header(reqwest::header::FROM, &self.from)
            .header(reqwest::header::ACCEPT, "application/geo+json")
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        tracing::debug!("Forecast response status: {}", status);

        let body = response.text().await?;
        if !status.is_success() {
            return Err(WxError::UpstreamStatus {
                status: status.as_u16(),
                body,
            });
        }

        let forecast: NwsForecast = serde_json::from_str(&body)?;
        tracing::info!(
            "Fetched {} forecast periods (updated {})",
            forecast.properties.periods.len(),
            forecast.properties.updated
        );
        Ok(forecast)
    }

    async fn transform(&self, raw: NwsForecast) -> Result<ForecastUpdate> {
        let updated = raw.properties.updated.with_timezone(&Utc);
        let existing = self.existing_predictions().await?;

        let newest_stored = existing.iter().map(|p| p.forecast_updated_time).max();
        if let Some(newest) = newest_stored {
            if updated <= newest {
                return Ok(ForecastUpdate::UpToDate { updated });
            }
        }
        let max_prediction_id = existing.iter().map(|p| p.id).max().unwrap_or(0);

        let mut descriptions =
            LookupTable::load(&self.storage, &self.descriptions_path, DESCRIPTION_COLUMN).await?;
        let mut icons = LookupTable::load(&self.storage, &self.icons_path, ICON_COLUMN).await?;
        let mut descriptions_changed = false;
        let mut icons_changed = false;

        let mut predictions = Vec::with_capacity(raw.properties.periods.len());
        for period in &raw.properties.periods {
            let (description_id, new_description) = descriptions.get_or_insert(&period.short_forecast);
            let (icon_id, new_icon) = icons.get_or_insert(&period.icon);
            descriptions_changed |= new_description;
            icons_changed |= new_icon;

            predictions.push(to_prediction(
                period,
                max_prediction_id + u64::from(period.number),
                updated,
                description_id,
                icon_id,
            ));
        }

        Ok(ForecastUpdate::New(ForecastBatch {
            updated,
            predictions,
            descriptions,
            icons,
            descriptions_changed,
            icons_changed,
        }))
    }

    async fn load(&self, output: ForecastUpdate) -> Result<String> {
        let batch = match output {
            ForecastUpdate::UpToDate { updated } => {
                tracing::info!(
                    "CSV already up to date with the most recent forecast data ({})",
                    updated
                );
                return Ok(format!("up to date ({})", updated.to_rfc3339()));
            }
            ForecastUpdate::New(batch) => batch,
        };

        if batch.descriptions_changed {
            tracing::info!("Writing {} forecast descriptions", batch.descriptions.len());
            self.storage
                .write_file(&self.descriptions_path, &batch.descriptions.to_csv()?)
                .await?;
        }
        if batch.icons_changed {
            tracing::info!("Writing {} forecast icons", batch.icons.len());
            self.storage
                .write_file(&self.icons_path, &batch.icons.to_csv()?)
                .await?;
        }

        table::append_rows(&self.storage, &self.predictions_path, &batch.predictions).await?;
        tracing::info!(
            "Added {} predictions for forecast updated {}",
            batch.predictions.len(),
            batch.updated
        );
        Ok(self.predictions_path.clone())
    }
}

fn to_prediction(
    period: &NwsPeriod,
    id: u64,
    updated: DateTime<Utc>,
    description_id: u64,
    icon_id: u64,
) -> ForecastPrediction {
    ForecastPrediction {
        id,
        number: period.number,
        start_time: period.start_time.with_timezone(&Utc),
        end_time: period.end_time.with_timezone(&Utc),
        is_daytime: period.is_daytime,
        temperature: Some(period.temperature.round() as i16),
        probability_of_precipitation: period
            .probability_of_precipitation
            .as_ref()
            .and_then(|p| p.value)
            .map(|v| v.round().clamp(0.0, 100.0) as i8),
        dewpoint: period.dewpoint.as_ref().and_then(dewpoint_f),
        wind_speed: parse_wind_speed(&period.wind_speed),
        wind_direction: compass_to_degrees(&period.wind_direction),
        forecast_updated_time: updated,
        forecast_descriptions_id: Some(description_id),
        icon_id: Some(icon_id),
    }
}

/// Whole °F, truncated. The API reports dewpoint in `wmoUnit:degC`.
fn dewpoint_f(value: &QuantitativeValue) -> Option<i16> {
    let v = value.value?;
    let is_fahrenheit = value
        .unit_code
        .as_deref()
        .is_some_and(|unit| unit.ends_with("degF"));
    let f = if is_fahrenheit { v } else { c_to_f(v) };
    Some(f as i16)
}

/// `"12 mph"` -> 12, `"10 to 15 mph"` -> 10.
pub fn parse_wind_speed(raw: &str) -> Option<i16> {
    raw.split_whitespace()
        .next()?
        .parse::<f64>()
        .ok()
        .map(|v| v.round() as i16)
}

pub fn compass_to_degrees(raw: &str) -> Option<i16> {
    let degrees = match raw.trim().to_ascii_uppercase().as_str() {
        "N" => 0,
        "NNE" => 23,
        "NE" => 45,
        "ENE" => 68,
        "E" => 90,
        "ESE" => 113,
        "SE" => 135,
        "SSE" => 158,
        "S" => 180,
        "SSW" => 203,
        "SW" => 225,
        "WSW" => 248,
        "W" => 270,
        "WNW" => 293,
        "NW" => 315,
        "NNW" => 338,
        _ => return None,
    };
    Some(degrees)
}
