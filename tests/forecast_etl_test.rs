use httpmock::prelude::*;
use tempfile::TempDir;
use wx_station::core::forecast::{DESCRIPTION_COLUMN, ICON_COLUMN};
use wx_station::core::lookup::LookupTable;
use wx_station::core::table;
use wx_station::domain::model::ForecastPrediction;
use wx_station::{EtlEngine, ForecastPipeline, LocalStorage, StationConfig};

const FORECAST_PATH: &str = "/gridpoints/LSX/103,81/forecast/hourly";

fn period(number: u32, start: &str, end: &str, temperature: i32, short_forecast: &str, icon: &str) -> serde_json::Value {
    serde_json::json!({
        "number": number,
        "name": "",
        "startTime": start,
        "endTime": end,
        "isDaytime": true,
        "temperature": temperature,
        "temperatureUnit": "F",
        "probabilityOfPrecipitation": {"unitCode": "wmoUnit:percent", "value": 10 * number},
        "dewpoint": {"unitCode": "wmoUnit:degC", "value": 20.0},
        "relativeHumidity": {"unitCode": "wmoUnit:percent", "value": 60},
        "windSpeed": "5 mph",
        "windDirection": "NW",
        "icon": icon,
        "shortForecast": short_forecast,
        "detailedForecast": ""
    })
}

fn forecast(updated: &str, periods: Vec<serde_json::Value>) -> serde_json::Value {
    serde_json::json!({
        "type": "Feature",
        "properties": {
            "units": "us",
            "generatedAt": updated,
            "updated": updated,
            "periods": periods
        }
    })
}

fn engine(server: &MockServer, data_dir: &std::path::Path) -> EtlEngine<ForecastPipeline<LocalStorage>> {
    let toml_content = format!(
        r#"
[storage]
data_dir = "{}"

[location]
name = "Test"
latitude = 38.78
longitude = -89.93

[forecast]
endpoint = "{}"
user_agent = "wx-station-test"
from = "test@example.com"
"#,
        data_dir.display(),
        server.url(FORECAST_PATH)
    );
    let config = StationConfig::from_toml_str(&toml_content).unwrap();
    EtlEngine::new(ForecastPipeline::new(LocalStorage::new(data_dir), &config))
}

async fn stored_predictions(storage: &LocalStorage) -> Vec<ForecastPrediction> {
    table::read_table(storage, "forecast/FORECAST_PREDICTIONS.csv").await.unwrap()
}

#[tokio::test]
async fn test_forecast_etl_end_to_end() {
    let temp_dir = TempDir::new().unwrap();
    let storage = LocalStorage::new(temp_dir.path());
    let server = MockServer::start();

    // first forecast
    let mut first_mock = server.mock(|when, then| {
        when.method(GET).path(FORECAST_PATH).header("User-Agent", "wx-station-test");
        then.status(200)
            .header("Content-Type", "application/geo+json")
            .json_body(forecast(
                "2024-06-01T17:35:26+00:00",
                vec![
                    period(1, "2024-06-01T13:00:00-05:00", "2024-06-01T14:00:00-05:00", 84, "Sunny", "https://icons/day/skc"),
                    period(2, "2024-06-01T14:00:00-05:00", "2024-06-01T15:00:00-05:00", 86, "Mostly Sunny", "https://icons/day/few"),
                    period(3, "2024-06-01T15:00:00-05:00", "2024-06-01T16:00:00-05:00", 87, "Sunny", "https://icons/day/skc"),
                ],
            ));
    });

    let engine = engine(&server, temp_dir.path());
    let output = engine.run().await.unwrap();
    first_mock.assert();
    assert_eq!(output, "forecast/FORECAST_PREDICTIONS.csv");

    let predictions = stored_predictions(&storage).await;
    assert_eq!(predictions.len(), 3);
    assert_eq!(predictions.iter().map(|p| p.id).collect::<Vec<_>>(), vec![1, 2, 3]);
    assert_eq!(predictions[0].start_time.to_rfc3339(), "2024-06-01T18:00:00+00:00");
    assert_eq!(predictions[0].wind_direction, Some(315));
    // 20 °C = 68 °F
    assert_eq!(predictions[0].dewpoint, Some(68));
    assert_eq!(predictions[0].forecast_descriptions_id, predictions[2].forecast_descriptions_id);

    let descriptions = LookupTable::load(&storage, "forecast/FORECAST_DESCRIPTIONS.csv", DESCRIPTION_COLUMN)
        .await
        .unwrap();
    assert_eq!(descriptions.len(), 2);
    assert_eq!(descriptions.id_of("Sunny"), Some(1));
    assert_eq!(descriptions.id_of("Mostly Sunny"), Some(2));

    // same forecast again: nothing is written
    let second = engine.run().await.unwrap();
    assert!(second.starts_with("up to date"), "{}", second);
    assert_eq!(stored_predictions(&storage).await.len(), 3);
    assert_eq!(first_mock.hits(), 2);
    first_mock.delete();

    // newer forecast reuses known descriptions and adds new ones
    let newer_mock = server.mock(|when, then| {
        when.method(GET).path(FORECAST_PATH);
        then.status(200).json_body(forecast(
            "2024-06-01T18:40:00+00:00",
            vec![
                period(1, "2024-06-01T14:00:00-05:00", "2024-06-01T15:00:00-05:00", 85, "Mostly Sunny", "https://icons/day/few"),
                period(2, "2024-06-01T15:00:00-05:00", "2024-06-01T16:00:00-05:00", 83, "Slight Chance Showers", "https://icons/day/rain"),
            ],
        ));
    });

    engine.run().await.unwrap();
    newer_mock.assert();

    let predictions = stored_predictions(&storage).await;
    assert_eq!(predictions.len(), 5);
    assert_eq!(predictions[3].id, 4);
    assert_eq!(predictions[4].id, 5);
    assert_eq!(predictions[3].forecast_descriptions_id, Some(2));
    assert_eq!(predictions[4].forecast_descriptions_id, Some(3));

    let icons = LookupTable::load(&storage, "forecast/FORECAST_ICONS.csv", ICON_COLUMN)
        .await
        .unwrap();
    assert_eq!(icons.len(), 3);
    assert_eq!(icons.value_of(3), Some("https://icons/day/rain"));
}

#[tokio::test]
async fn test_forecast_etl_upstream_failure_writes_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(GET).path(FORECAST_PATH);
        then.status(500).body("Internal Server Error");
    });

    let result = engine(&server, temp_dir.path()).run().await;

    api_mock.assert();
    let err = result.unwrap_err();
    assert_eq!(err.severity().exit_code(), 2);
    assert!(!temp_dir.path().join("forecast").exists());
}

#[tokio::test]
async fn test_forecast_etl_malformed_payload() {
    let temp_dir = TempDir::new().unwrap();
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path(FORECAST_PATH);
        then.status(200).body("{\"properties\": {}}");
    });

    let result = engine(&server, temp_dir.path()).run().await;

    assert!(matches!(result, Err(wx_station::WxError::SerializationError(_))));
}
