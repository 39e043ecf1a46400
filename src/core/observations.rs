use crate::core::dewpoint::dew_point_f;
use crate::core::table;
use crate::domain::model::{Observation, StationReading, STATION_DATE_FORMAT};
use crate::domain::ports::Storage;
use crate::utils::error::{Result, WxError};
use chrono::{NaiveDateTime, Utc};
use tokio::sync::Mutex;

/// Append-only CSV of station observations.
///
/// Row ids are `max(id) + 1`. The max is scanned from the file on the first
/// append and cached afterwards; the mutex keeps concurrent appends from
/// handing out the same id.
pub struct ObservationLog<S: Storage> {
    storage: S,
    path: String,
    last_id: Mutex<Option<u64>>,
}

impl<S: Storage> ObservationLog<S> {
    pub fn new(storage: S, path: impl Into<String>) -> Self {
        Self {
            storage,
            path: path.into(),
            last_id: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub async fn read_all(&self) -> Result<Vec<Observation>> {
        table::read_table(&self.storage, &self.path).await
    }

    pub async fn append(&self, reading: &StationReading) -> Result<Observation> {
        if let Some(field) = reading.first_non_finite() {
            return Err(WxError::validation(format!("{} must be a finite number", field)));
        }
        if !(reading.humidity > 0.0 && reading.humidity <= 100.0) {
            return Err(WxError::validation(format!(
                "humidity must be in (0, 100], got {}",
                reading.humidity
            )));
        }
        let dateutc = normalize_dateutc(&reading.dateutc)?;
        let dewpoint = dew_point_f(reading.tempf, reading.humidity)
            .map(|dp| (dp * 100.0).round() / 100.0);

        let mut last_id = self.last_id.lock().await;
        let current_max = match *last_id {
            Some(id) => id,
            None => self.scan_max_id().await?,
        };

        let mut observation = Observation::from_reading(current_max + 1, reading, dewpoint);
        observation.dateutc = dateutc;

        table::append_rows(&self.storage, &self.path, std::slice::from_ref(&observation)).await?;
        *last_id = Some(observation.id);

        tracing::debug!(
            "Stored observation {} at {} (temp {:.1}°F, dewpoint {:?})",
            observation.id,
            observation.dateutc,
            reading.tempf,
            observation.dewpointf
        );
        Ok(observation)
    }

    async fn scan_max_id(&self) -> Result<u64> {
        let rows: Vec<Observation> = self.read_all().await?;
        let max = rows.iter().map(|row| row.id).max().unwrap_or(0);
        tracing::info!("Observation log {} holds {} rows, max id {}", self.path, rows.len(), max);
        Ok(max)
    }
}

/// Stations may send `now` instead of a timestamp.
pub fn normalize_dateutc(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("now") {
        return Ok(Utc::now().format(STATION_DATE_FORMAT).to_string());
    }
    NaiveDateTime::parse_from_str(trimmed, STATION_DATE_FORMAT)
        .map(|dt| dt.format(STATION_DATE_FORMAT).to_string())
        .map_err(|e| WxError::validation(format!("dateutc '{}' is not {}: {}", raw, STATION_DATE_FORMAT, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LocalStorage;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn reading(dateutc: &str, tempf: f64, humidity: f64) -> StationReading {
        StationReading {
            dateutc: dateutc.to_string(),
            tempf,
            humidity,
            windspeedmph: Some(4.5),
            winddir: Some(200.0),
            dailyrainin: Some(0.12),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_append_assigns_sequential_ids_and_writes_header_once() {
        let temp_dir = TempDir::new().unwrap();
        let log = ObservationLog::new(LocalStorage::new(temp_dir.path()), "obs/log.csv");

        let first = log.append(&reading("2024-06-01 12:00:00", 80.0, 50.0)).await.unwrap();
        let second = log.append(&reading("2024-06-01 12:01:00", 81.0, 49.0)).await.unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);

        let content = std::fs::read_to_string(temp_dir.path().join("obs/log.csv")).unwrap();
        assert_eq!(content.matches("dewpointf").count(), 1);
        assert!(content.starts_with("id,dateutc,tempinf"));

        let rows = log.read_all().await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].dailyrainin, Some(0.12));
        assert_eq!(rows[1].solarradiation, None);
    }

    #[tokio::test]
    async fn test_append_continues_from_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let log = ObservationLog::new(LocalStorage::new(temp_dir.path()), "log.csv");
        log.append(&reading("2024-06-01 12:00:00", 70.0, 60.0)).await.unwrap();
        log.append(&reading("2024-06-01 12:05:00", 70.5, 60.0)).await.unwrap();

        // a fresh log (server restart) must rescan the file
        let reopened = ObservationLog::new(LocalStorage::new(temp_dir.path()), "log.csv");
        let third = reopened.append(&reading("2024-06-01 12:10:00", 71.0, 59.0)).await.unwrap();
        assert_eq!(third.id, 3);

        let rows = reopened.read_all().await.unwrap();
        let newest = rows.iter().max_by_key(|row| row.id).unwrap();
        assert_eq!(newest.dateutc, "2024-06-01 12:10:00");
    }

    #[tokio::test]
    async fn test_truncated_log_gets_a_header_again() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp_dir.path());
        storage.write_file("log.csv", b"").await.unwrap();

        let log = ObservationLog::new(storage.clone(), "log.csv");
        log.append(&reading("2024-06-01 12:00:00", 70.0, 60.0)).await.unwrap();
        log.append(&reading("2024-06-01 12:05:00", 70.5, 60.0)).await.unwrap();

        let content = std::fs::read_to_string(temp_dir.path().join("log.csv")).unwrap();
        assert!(content.starts_with("id,dateutc,"));
        assert_eq!(log.read_all().await.unwrap().len(), 2);

        let reopened = ObservationLog::new(storage, "log.csv");
        let third = reopened.append(&reading("2024-06-01 12:10:00", 71.0, 59.0)).await.unwrap();
        assert_eq!(third.id, 3);
    }

    #[tokio::test]
    async fn test_rejects_non_finite_measurements() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp_dir.path());
        let log = ObservationLog::new(storage.clone(), "log.csv");

        let err = log.append(&reading("2024-06-01 12:00:00", f64::NAN, 50.0)).await.unwrap_err();
        assert!(err.to_string().contains("tempf"), "{}", err);

        let mut gusty = reading("2024-06-01 12:00:00", 70.0, 50.0);
        gusty.windspeedmph = Some(f64::INFINITY);
        let err = log.append(&gusty).await.unwrap_err();
        assert!(matches!(err, WxError::ValidationError { .. }));
        assert!(err.to_string().contains("windspeedmph"), "{}", err);

        assert!(!storage.exists("log.csv").await);
    }

    #[tokio::test]
    async fn test_concurrent_appends_get_unique_ids() {
        let temp_dir = TempDir::new().unwrap();
        let log = Arc::new(ObservationLog::new(LocalStorage::new(temp_dir.path()), "log.csv"));

        let mut handles = Vec::new();
        for minute in 0..20 {
            let log = log.clone();
            handles.push(tokio::spawn(async move {
                let dateutc = format!("2024-06-01 12:{:02}:00", minute);
                log.append(&reading(&dateutc, 75.0, 40.0)).await.unwrap().id
            }));
        }
        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap());
        }
        ids.sort_unstable();
        assert_eq!(ids, (1..=20).collect::<Vec<u64>>());
        assert_eq!(log.read_all().await.unwrap().len(), 20);
    }

    #[tokio::test]
    async fn test_dewpoint_is_computed() {
        let temp_dir = TempDir::new().unwrap();
        let log = ObservationLog::new(LocalStorage::new(temp_dir.path()), "log.csv");

        let stored = log.append(&reading("2024-06-01 12:00:00", 86.0, 70.0)).await.unwrap();
        let dp = stored.dewpointf.unwrap();
        assert!((dp - 75.05).abs() < 0.01, "dp={}", dp);
    }

    #[tokio::test]
    async fn test_rejects_bad_humidity_and_date_without_writing() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp_dir.path());
        let log = ObservationLog::new(storage.clone(), "log.csv");

        assert!(matches!(
            log.append(&reading("2024-06-01 12:00:00", 70.0, 0.0)).await,
            Err(WxError::ValidationError { .. })
        ));
        assert!(matches!(
            log.append(&reading("June 1st", 70.0, 50.0)).await,
            Err(WxError::ValidationError { .. })
        ));
        assert!(!storage.exists("log.csv").await);
    }

    #[test]
    fn test_normalize_dateutc() {
        assert_eq!(
            normalize_dateutc(" 2024-06-01 09:03:07 ").unwrap(),
            "2024-06-01 09:03:07"
        );
        let now = normalize_dateutc("now").unwrap();
        assert!(NaiveDateTime::parse_from_str(&now, STATION_DATE_FORMAT).is_ok());
        assert!(normalize_dateutc("2024-06-01T09:03:07Z").is_err());
    }
}
