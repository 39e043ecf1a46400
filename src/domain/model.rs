use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Format the station uses for `dateutc`.
pub const STATION_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One report from the weather station, as it arrives on the query string.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StationReading {
    #[serde(default)]
    pub stationtype: Option<String>,
    #[serde(rename = "PASSKEY", default)]
    pub passkey: Option<String>,
    pub dateutc: String,
    pub tempinf: Option<f64>,
    pub humidityin: Option<f64>,
    pub baromrelin: Option<f64>,
    pub baromabsin: Option<f64>,
    pub tempf: f64,
    pub humidity: f64,
    pub winddir: Option<f64>,
    pub windspeedmph: Option<f64>,
    pub windgustmph: Option<f64>,
    pub maxdailygust: Option<f64>,
    pub hourlyrainin: Option<f64>,
    pub eventrainin: Option<f64>,
    pub dailyrainin: Option<f64>,
    pub weeklyrainin: Option<f64>,
    pub monthlyrainin: Option<f64>,
    pub totalrainin: Option<f64>,
    pub solarradiation: Option<f64>,
    pub uv: Option<f64>,
    pub batt_co2: Option<f64>,
}

impl StationReading {
    /// Name of the first measurement that is NaN or infinite.
    ///
    /// The query-string decoder happily parses `NaN` and `inf` as `f64`.
    pub fn first_non_finite(&self) -> Option<&'static str> {
        let measurements = [
            ("tempinf", self.tempinf),
            ("humidityin", self.humidityin),
            ("baromrelin", self.baromrelin),
            ("baromabsin", self.baromabsin),
            ("tempf", Some(self.tempf)),
            ("humidity", Some(self.humidity)),
            ("winddir", self.winddir),
            ("windspeedmph", self.windspeedmph),
            ("windgustmph", self.windgustmph),
            ("maxdailygust", self.maxdailygust),
            ("hourlyrainin", self.hourlyrainin),
            ("eventrainin", self.eventrainin),
            ("dailyrainin", self.dailyrainin),
            ("weeklyrainin", self.weeklyrainin),
            ("monthlyrainin", self.monthlyrainin),
            ("totalrainin", self.totalrainin),
            ("solarradiation", self.solarradiation),
            ("uv", self.uv),
            ("batt_co2", self.batt_co2),
        ];
        measurements
            .into_iter()
            .find(|(_, value)| value.is_some_and(|v| !v.is_finite()))
            .map(|(name, _)| name)
    }
}

/// A stored observation row. Field order is the CSV column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    #[serde(deserialize_with = "de_row_id")]
    pub id: u64,
    pub dateutc: String,
    #[serde(deserialize_with = "csv::invalid_option")]
    pub tempinf: Option<f64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    pub humidityin: Option<f64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    pub baromrelin: Option<f64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    pub baromabsin: Option<f64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    pub tempf: Option<f64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    pub humidity: Option<f64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    pub dewpointf: Option<f64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    pub winddir: Option<f64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    pub windspeedmph: Option<f64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    pub windgustmph: Option<f64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    pub maxdailygust: Option<f64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    pub hourlyrainin: Option<f64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    pub eventrainin: Option<f64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    pub dailyrainin: Option<f64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    pub weeklyrainin: Option<f64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    pub monthlyrainin: Option<f64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    pub totalrainin: Option<f64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    pub solarradiation: Option<f64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    pub uv: Option<f64>,
}

impl Observation {
    pub fn from_reading(id: u64, reading: &StationReading, dewpointf: Option<f64>) -> Self {
        Self {
            id,
            dateutc: reading.dateutc.clone(),
            tempinf: reading.tempinf,
            humidityin: reading.humidityin,
            baromrelin: reading.baromrelin,
            baromabsin: reading.baromabsin,
            tempf: Some(reading.tempf),
            humidity: Some(reading.humidity),
            dewpointf,
            winddir: reading.winddir,
            windspeedmph: reading.windspeedmph,
            windgustmph: reading.windgustmph,
            maxdailygust: reading.maxdailygust,
            hourlyrainin: reading.hourlyrainin,
            eventrainin: reading.eventrainin,
            dailyrainin: reading.dailyrainin,
            weeklyrainin: reading.weeklyrainin,
            monthlyrainin: reading.monthlyrainin,
            totalrainin: reading.totalrainin,
            solarradiation: reading.solarradiation,
            uv: reading.uv,
        }
    }

    /// Observation time in UTC, if `dateutc` is well formed.
    pub fn observed_at(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(self.dateutc.trim(), STATION_DATE_FORMAT).ok()
    }
}

/// api.weather.gov gridpoint forecast document (only the parts we use).
#[derive(Debug, Clone, Deserialize)]
pub struct NwsForecast {
    pub properties: NwsProperties,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NwsProperties {
    pub updated: DateTime<FixedOffset>,
    pub periods: Vec<NwsPeriod>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NwsPeriod {
    pub number: u32,
    pub start_time: DateTime<FixedOffset>,
    pub end_time: DateTime<FixedOffset>,
    pub is_daytime: bool,
    pub temperature: f64,
    #[serde(default)]
    pub probability_of_precipitation: Option<QuantitativeValue>,
    #[serde(default)]
    pub dewpoint: Option<QuantitativeValue>,
    #[serde(default)]
    pub wind_speed: String,
    #[serde(default)]
    pub wind_direction: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub short_forecast: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuantitativeValue {
    #[serde(default)]
    pub unit_code: Option<String>,
    pub value: Option<f64>,
}

/// A stored forecast row. Field order is the CSV column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPrediction {
    #[serde(deserialize_with = "de_row_id")]
    pub id: u64,
    pub number: u32,
    #[serde(rename = "startTime", deserialize_with = "de_utc_datetime")]
    pub start_time: DateTime<Utc>,
    #[serde(rename = "endTime", deserialize_with = "de_utc_datetime")]
    pub end_time: DateTime<Utc>,
    #[serde(rename = "isDaytime")]
    pub is_daytime: bool,
    #[serde(deserialize_with = "csv::invalid_option")]
    pub temperature: Option<i16>,
    #[serde(
        rename = "probabilityOfPrecipitation",
        deserialize_with = "csv::invalid_option"
    )]
    pub probability_of_precipitation: Option<i8>,
    #[serde(deserialize_with = "csv::invalid_option")]
    pub dewpoint: Option<i16>,
    #[serde(rename = "windSpeed", deserialize_with = "csv::invalid_option")]
    pub wind_speed: Option<i16>,
    #[serde(rename = "windDirection", deserialize_with = "csv::invalid_option")]
    pub wind_direction: Option<i16>,
    #[serde(deserialize_with = "de_utc_datetime")]
    pub forecast_updated_time: DateTime<Utc>,
    #[serde(deserialize_with = "csv::invalid_option")]
    pub forecast_descriptions_id: Option<u64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    pub icon_id: Option<u64>,
}

/// Row ids written by older tooling are floats ("42.0").
fn de_row_id<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    let trimmed = raw.trim();
    if let Ok(id) = trimmed.parse::<u64>() {
        return Ok(id);
    }
    match trimmed.parse::<f64>() {
        Ok(id) if id.is_finite() && id >= 0.0 && id.fract() == 0.0 => Ok(id as u64),
        _ => Err(serde::de::Error::custom(format!("invalid row id '{}'", raw))),
    }
}

pub fn parse_utc_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"] {
        if let Ok(dt) = DateTime::parse_from_str(raw, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    None
}

fn de_utc_datetime<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_utc_datetime(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{}'", raw)))
}
