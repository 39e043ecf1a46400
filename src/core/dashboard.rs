//! Everything the dashboard plots, computed server-side from the CSV files.
//!
//! Times handed to the browser are naive local wall-clock times in the
//! station's zone; plotly draws them as-is.

use crate::config::StationConfig;
use crate::core::riseset::sun_times;
use crate::core::table;
use crate::domain::model::{ForecastPrediction, Observation};
use crate::domain::ports::Storage;
use crate::utils::error::Result;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::collections::BTreeMap;

pub const TEMP_PLOT_PADDING: f64 = 5.0;
pub const WIND_PLOT_PADDING: f64 = 2.0;
pub const RAIN_PLOT_PADDING: f64 = 1.0;
pub const FREEZING_F: f64 = 32.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherPoint {
    pub date: NaiveDateTime,
    pub temp: Option<f64>,
    pub dewpoint: Option<f64>,
    pub wind_speed: Option<f64>,
    pub wind_direction: Option<f64>,
    pub gust_speed: Option<f64>,
    pub rain_hourly: Option<f64>,
    pub rain_daily: Option<f64>,
    pub rain_event: Option<f64>,
    pub precip_prob: Option<f64>,
    pub prediction: bool,
}

impl WeatherPoint {
    fn empty(date: NaiveDateTime, prediction: bool) -> Self {
        Self {
            date,
            temp: None,
            dewpoint: None,
            wind_speed: None,
            wind_direction: None,
            gust_speed: None,
            rain_hourly: None,
            rain_daily: None,
            rain_event: None,
            precip_prob: None,
            prediction,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationKind {
    HighTemp,
    LowTemp,
    HighWind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Annotation {
    pub kind: AnnotationKind,
    pub date: NaiveDateTime,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindBin {
    pub start: NaiveDateTime,
    pub wind_speed: Option<f64>,
    pub temp: Option<f64>,
    pub wind_direction: Option<f64>,
    pub prediction: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrecipPoint {
    pub date: NaiveDateTime,
    pub probability: f64,
    /// Probability rescaled onto the rain axis.
    pub scaled: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AxisBounds {
    pub temp: (f64, f64),
    pub wind: (f64, f64),
    pub rain: (f64, f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    Midnight,
    Sunrise,
    Sunset,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerticalMarker {
    pub kind: MarkerKind,
    pub at: NaiveDateTime,
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Band {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlotWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl PlotWindow {
    /// Missing bounds default to yesterday 00:00:01 .. tomorrow 23:59:59.
    pub fn resolve(
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
        now_local: NaiveDateTime,
    ) -> Self {
        let first_second = NaiveTime::from_hms_opt(0, 0, 1).unwrap_or(NaiveTime::MIN);
        let last_second = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
        let start =
            start.unwrap_or_else(|| (now_local.date() - Duration::days(1)).and_time(first_second));
        let end = end.unwrap_or_else(|| (now_local.date() + Duration::days(1)).and_time(last_second));
        Self { start, end }
    }

    pub fn contains(&self, at: NaiveDateTime) -> bool {
        at >= self.start && at <= self.end
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TodayHighLow {
    pub high_temp: Option<f64>,
    pub low_temp: Option<f64>,
    pub high_wind: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentConditions {
    pub observed_at: Option<NaiveDateTime>,
    pub temp: Option<f64>,
    pub temp_color: &'static str,
    pub dewpoint: Option<f64>,
    pub humidity: Option<f64>,
    pub wind_speed: Option<f64>,
    pub wind_direction: Option<f64>,
    pub gust_speed: Option<f64>,
    pub pressure: Option<f64>,
    pub daily_rain: Option<f64>,
    pub uv: Option<f64>,
    pub solar_radiation: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesView {
    pub window: PlotWindow,
    pub observed: Vec<WeatherPoint>,
    pub predicted: Vec<WeatherPoint>,
    pub annotations: Vec<Annotation>,
    pub wind_bin_minutes: i64,
    pub wind_bins: Vec<WindBin>,
    pub precip: Vec<PrecipPoint>,
    pub bounds: AxisBounds,
    pub show_freezing_line: bool,
    pub markers: Vec<VerticalMarker>,
    pub night_bands: Vec<Band>,
}

pub fn to_local(at: DateTime<Utc>, tz: &Tz) -> NaiveDateTime {
    at.with_timezone(tz).naive_local()
}

fn max_of(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    values.flatten().filter(|v| v.is_finite()).fold(None, |acc, v| match acc {
        Some(m) if m >= v => Some(m),
        _ => Some(v),
    })
}

fn min_of(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    values.flatten().filter(|v| v.is_finite()).fold(None, |acc, v| match acc {
        Some(m) if m <= v => Some(m),
        _ => Some(v),
    })
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// Latest observations: the last `max_rows` ids, within `history_days` of `now`, newest first.
pub fn recent_observations(
    rows: &[Observation],
    now: DateTime<Utc>,
    tz: &Tz,
    history_days: u64,
    max_rows: u64,
) -> Vec<WeatherPoint> {
    let Some(max_id) = rows.iter().map(|r| r.id).max() else {
        return Vec::new();
    };
    let min_id = max_id.saturating_sub(max_rows);
    let cutoff = now - Duration::days(history_days as i64);

    let mut points: Vec<WeatherPoint> = rows
        .iter()
        .filter(|r| r.id >= min_id)
        .filter_map(|r| {
            let observed = r.observed_at()?.and_utc();
            if observed <= cutoff {
                return None;
            }
            Some(WeatherPoint {
                temp: r.tempf,
                dewpoint: r.dewpointf.map(round1),
                wind_speed: r.windspeedmph,
                wind_direction: r.winddir,
                gust_speed: r.windgustmph,
                rain_hourly: r.hourlyrainin,
                rain_daily: r.dailyrainin,
                rain_event: r.eventrainin,
                ..WeatherPoint::empty(to_local(observed, tz), false)
            })
        })
        .collect();

    points.sort_by(|a, b| b.date.cmp(&a.date));
    points
}

/// Periods of the newest forecast that start after the current hour began, oldest first.
pub fn latest_predictions(
    rows: &[ForecastPrediction],
    now: DateTime<Utc>,
    tz: &Tz,
) -> Vec<WeatherPoint> {
    let Some(latest) = rows.iter().map(|r| r.forecast_updated_time).max() else {
        return Vec::new();
    };
    let hour_start = now
        .with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(now);

    let mut points: Vec<WeatherPoint> = rows
        .iter()
        .filter(|r| r.forecast_updated_time == latest && r.start_time > hour_start)
        .map(|r| WeatherPoint {
            temp: r.temperature.map(f64::from),
            dewpoint: r.dewpoint.map(f64::from),
            wind_speed: r.wind_speed.map(f64::from),
            wind_direction: r.wind_direction.map(f64::from),
            precip_prob: r.probability_of_precipitation.map(f64::from),
            ..WeatherPoint::empty(to_local(r.start_time, tz), true)
        })
        .collect();

    points.sort_by(|a, b| a.date.cmp(&b.date));
    points
}

pub fn filter_window(points: &[WeatherPoint], window: &PlotWindow) -> Vec<WeatherPoint> {
    points
        .iter()
        .filter(|p| window.contains(p.date))
        .cloned()
        .collect()
}

/// Accepts the shapes plotly hands back in relayout events.
pub fn parse_plot_bound(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    for format in [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Per calendar day: the earliest point at the high temp, low temp and high wind.
pub fn high_low_annotations(points: &[WeatherPoint]) -> Vec<Annotation> {
    let mut by_day: BTreeMap<NaiveDate, Vec<&WeatherPoint>> = BTreeMap::new();
    for point in points {
        by_day.entry(point.date.date()).or_default().push(point);
    }

    let mut annotations = Vec::new();
    for day_points in by_day.values_mut() {
        day_points.sort_by_key(|p| p.date);

        let extremes = [
            (AnnotationKind::HighTemp, max_of(day_points.iter().map(|p| p.temp)), 0),
            (AnnotationKind::LowTemp, min_of(day_points.iter().map(|p| p.temp)), 0),
            (AnnotationKind::HighWind, max_of(day_points.iter().map(|p| p.wind_speed)), 1),
        ];
        for (kind, extreme, column) in extremes {
            let Some(value) = extreme else { continue };
            let hit = day_points.iter().find(|p| {
                let v = if column == 0 { p.temp } else { p.wind_speed };
                v == Some(value)
            });
            if let Some(p) = hit {
                annotations.push(Annotation {
                    kind,
                    date: p.date,
                    value,
                });
            }
        }
    }
    annotations
}

/// High/low since local midnight, from observations only.
pub fn today_high_low(points: &[WeatherPoint], now_local: NaiveDateTime) -> TodayHighLow {
    let midnight = now_local.date().and_time(NaiveTime::MIN);
    let today = || points.iter().filter(|p| !p.prediction && p.date >= midnight);
    TodayHighLow {
        high_temp: max_of(today().map(|p| p.temp)),
        low_temp: min_of(today().map(|p| p.temp)),
        high_wind: max_of(today().map(|p| p.wind_speed)),
    }
}

pub fn temp_color(temp: f64) -> &'static str {
    if temp < 0.0 {
        "purple"
    } else if temp < 32.0 {
        "dodgerblue"
    } else if temp < 50.0 {
        "green"
    } else if temp < 70.0 {
        "yellow"
    } else if temp < 90.0 {
        "orange"
    } else {
        "red"
    }
}

pub fn current_conditions(latest: &Observation, tz: &Tz) -> CurrentConditions {
    CurrentConditions {
        observed_at: latest.observed_at().map(|t| to_local(t.and_utc(), tz)),
        temp: latest.tempf,
        temp_color: latest.tempf.map(temp_color).unwrap_or("gray"),
        dewpoint: latest.dewpointf.map(round1),
        humidity: latest.humidity,
        wind_speed: latest.windspeedmph,
        wind_direction: latest.winddir,
        gust_speed: latest.windgustmph,
        pressure: latest.baromrelin,
        daily_rain: latest.dailyrainin,
        uv: latest.uv,
        solar_radiation: latest.solarradiation,
    }
}

/// About 180 bins across the span; 15-minute bins for spans of 15 minutes or less; never under 2.
pub fn wind_bin_minutes(start: NaiveDateTime, end: NaiveDateTime) -> i64 {
    let span_seconds = (end - start).num_seconds();
    let minutes = if span_seconds > 60 * 15 {
        span_seconds / 60 / 180
    } else {
        15
    };
    minutes.max(2)
}

/// Mean of angles in degrees, in [0, 360).
pub fn circular_mean_degrees(angles: &[f64]) -> Option<f64> {
    if angles.is_empty() {
        return None;
    }
    let (sin_sum, cos_sum) = angles.iter().fold((0.0, 0.0), |(s, c), deg| {
        let rad = deg.to_radians();
        (s + rad.sin(), c + rad.cos())
    });
    let mean = sin_sum.atan2(cos_sum).to_degrees();
    Some(if mean < 0.0 { mean + 360.0 } else { mean })
}

/// Fixed-width bins aligned to multiples of `minutes`.
pub fn bin_wind(points: &[WeatherPoint], minutes: i64) -> Vec<WindBin> {
    let every = minutes.max(1) * 60;

    #[derive(Default)]
    struct Acc {
        speeds: Vec<Option<f64>>,
        temps: Vec<Option<f64>>,
        directions: Vec<f64>,
        prediction: bool,
    }

    let mut bins: BTreeMap<i64, Acc> = BTreeMap::new();
    for point in points {
        let ts = point.date.and_utc().timestamp();
        let key = ts.div_euclid(every) * every;
        let acc = bins.entry(key).or_default();
        acc.speeds.push(point.wind_speed);
        acc.temps.push(point.temp);
        acc.directions.extend(point.wind_direction);
        acc.prediction |= point.prediction;
    }

    bins.into_iter()
        .filter_map(|(key, acc)| {
            let start = DateTime::from_timestamp(key, 0)?.naive_utc();
            Some(WindBin {
                start,
                wind_speed: max_of(acc.speeds.into_iter()),
                temp: max_of(acc.temps.into_iter()),
                wind_direction: circular_mean_degrees(&acc.directions),
                prediction: acc.prediction,
            })
        })
        .collect()
}

/// Axis ranges, taken over the whole series so zooming does not rescale.
pub fn axis_bounds(points: &[WeatherPoint]) -> AxisBounds {
    let low = min_of(points.iter().map(|p| p.dewpoint)).or_else(|| min_of(points.iter().map(|p| p.temp)));
    let high = max_of(points.iter().map(|p| p.temp));
    let temp = match (low, high) {
        (Some(low), Some(high)) => (low - TEMP_PLOT_PADDING, high + TEMP_PLOT_PADDING),
        _ => (0.0, 100.0),
    };

    let wind_max = max_of(points.iter().map(|p| p.wind_speed)).unwrap_or(0.0) + WIND_PLOT_PADDING;
    let rain_max = max_of(points.iter().map(|p| p.rain_daily)).unwrap_or(0.0) + RAIN_PLOT_PADDING;

    AxisBounds {
        temp,
        wind: (0.0, wind_max),
        rain: (0.0, rain_max),
    }
}

pub fn precip_points(points: &[WeatherPoint], rain_max: f64) -> Vec<PrecipPoint> {
    points
        .iter()
        .filter(|p| p.prediction)
        .filter_map(|p| {
            let probability = p.precip_prob?;
            Some(PrecipPoint {
                date: p.date,
                probability,
                scaled: probability / 100.0 * rain_max,
            })
        })
        .collect()
}

/// Midnight/sunrise/sunset lines and shaded night bands, clipped to `[start, end]`.
pub fn day_night_overlay(
    start: NaiveDateTime,
    end: NaiveDateTime,
    latitude: f64,
    longitude: f64,
    tz: &Tz,
) -> (Vec<VerticalMarker>, Vec<Band>) {
    let mut markers = Vec::new();
    let mut bands = Vec::new();
    if end <= start {
        return (markers, bands);
    }

    let mut push_band = |from: NaiveDateTime, to: NaiveDateTime| {
        let from = from.max(start);
        let to = to.min(end);
        if from < to {
            bands.push(Band { start: from, end: to });
        }
    };

    let mut day = start.date();
    while day <= end.date() {
        let midnight = day.and_time(NaiveTime::MIN);
        let next_midnight = midnight + Duration::days(1);
        if midnight >= start && midnight <= end {
            markers.push(VerticalMarker {
                kind: MarkerKind::Midnight,
                at: midnight,
                label: midnight.format("%b %d").to_string(),
            });
        }

        match sun_times(day, latitude, longitude) {
            Some(sun) => {
                let sunrise = to_local(sun.sunrise, tz);
                let sunset = to_local(sun.sunset, tz);
                for (kind, at) in [(MarkerKind::Sunrise, sunrise), (MarkerKind::Sunset, sunset)] {
                    if at >= start && at <= end {
                        markers.push(VerticalMarker {
                            kind,
                            at,
                            label: at.format("%I:%M %p").to_string(),
                        });
                    }
                }
                push_band(midnight, sunrise);
                push_band(sunset, next_midnight);
            }
            None => tracing::debug!("No sunrise/sunset on {} at this latitude", day),
        }

        day = match day.succ_opt() {
            Some(next) => next,
            None => break,
        };
    }

    (markers, bands)
}

pub struct SeriesRequest {
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
}

/// Assembles one chart refresh from the merged observation + prediction series.
pub fn build_series(
    all_points: &[WeatherPoint],
    request: &SeriesRequest,
    now_local: NaiveDateTime,
    latitude: f64,
    longitude: f64,
    tz: &Tz,
) -> SeriesView {
    let window = PlotWindow::resolve(request.start, request.end, now_local);
    let mut plotted = filter_window(all_points, &window);
    plotted.sort_by_key(|p| p.date);

    // the x range follows the data actually in the window
    let (extent_start, extent_end) = match (plotted.first(), plotted.last()) {
        (Some(first), Some(last)) => (first.date, last.date),
        _ => (window.start, window.end),
    };

    let bounds = axis_bounds(all_points);
    let annotations = high_low_annotations(all_points)
        .into_iter()
        .filter(|a| a.date > extent_start && a.date <= extent_end)
        .collect();

    let wind_bin_minutes = wind_bin_minutes(extent_start, extent_end);
    let wind_bins = bin_wind(&plotted, wind_bin_minutes);
    let precip = precip_points(&plotted, bounds.rain.1);
    let (markers, night_bands) = day_night_overlay(extent_start, extent_end, latitude, longitude, tz);

    let (observed, predicted): (Vec<_>, Vec<_>) = plotted.into_iter().partition(|p| !p.prediction);

    SeriesView {
        window: PlotWindow {
            start: extent_start,
            end: extent_end,
        },
        observed,
        predicted,
        annotations,
        wind_bin_minutes,
        wind_bins,
        precip,
        show_freezing_line: bounds.temp.0 < FREEZING_F && bounds.temp.1 > FREEZING_F,
        bounds,
        markers,
        night_bands,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentView {
    pub current: Option<CurrentConditions>,
    pub today: TodayHighLow,
}

/// Reads the observation and forecast files for the dashboard endpoints.
pub struct DashboardSource<S: Storage> {
    storage: S,
    observations_path: String,
    predictions_path: String,
    tz: Tz,
    latitude: f64,
    longitude: f64,
    history_days: u64,
    max_history_rows: u64,
}

impl<S: Storage> DashboardSource<S> {
    pub fn new(storage: S, config: &StationConfig) -> Result<Self> {
        Ok(Self {
            storage,
            observations_path: config.storage.observations_file.clone(),
            predictions_path: config.forecast_predictions_path(),
            tz: config.timezone()?,
            latitude: config.location.latitude,
            longitude: config.location.longitude,
            history_days: config.dashboard.history_days,
            max_history_rows: config.dashboard.max_history_rows,
        })
    }

    pub fn now_local(&self, now: DateTime<Utc>) -> NaiveDateTime {
        to_local(now, &self.tz)
    }

    async fn observations(&self) -> Result<Vec<Observation>> {
        table::read_table(&self.storage, &self.observations_path).await
    }

    /// Recent observations followed by the latest forecast.
    pub async fn weather_points(&self, now: DateTime<Utc>) -> Result<Vec<WeatherPoint>> {
        let observations = self.observations().await?;
        let predictions: Vec<ForecastPrediction> =
            table::read_table(&self.storage, &self.predictions_path).await?;

        let mut points = recent_observations(
            &observations,
            now,
            &self.tz,
            self.history_days,
            self.max_history_rows,
        );
        points.extend(latest_predictions(&predictions, now, &self.tz));
        Ok(points)
    }

    pub async fn series(&self, now: DateTime<Utc>, request: &SeriesRequest) -> Result<SeriesView> {
        let points = self.weather_points(now).await?;
        Ok(build_series(
            &points,
            request,
            self.now_local(now),
            self.latitude,
            self.longitude,
            &self.tz,
        ))
    }

    pub async fn current(&self, now: DateTime<Utc>) -> Result<CurrentView> {
        let observations = self.observations().await?;
        let latest = observations.iter().max_by_key(|o| o.id);
        let recent = recent_observations(
            &observations,
            now,
            &self.tz,
            self.history_days,
            self.max_history_rows,
        );
        Ok(CurrentView {
            current: latest.map(|o| current_conditions(o, &self.tz)),
            today: today_high_low(&recent, self.now_local(now)),
        })
    }
}
