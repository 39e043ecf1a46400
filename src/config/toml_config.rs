use crate::utils::error::{Result, WxError};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_NWS_BASE_URL: &str = "https://api.weather.gov";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    pub location: LocationConfig,
    #[serde(default)]
    pub forecast: ForecastConfig,
    #[serde(default)]
    pub radar: RadarConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// When set, observations carrying a different PASSKEY are rejected.
    #[serde(default)]
    pub passkey: Option<String>,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_observations_file")]
    pub observations_file: String,
    #[serde(default = "default_forecast_dir")]
    pub forecast_dir: String,
    #[serde(default = "default_radar_file")]
    pub radar_file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastConfig {
    #[serde(default = "default_office")]
    pub office: String,
    #[serde(default = "default_grid_x")]
    pub grid_x: u32,
    #[serde(default = "default_grid_y")]
    pub grid_y: u32,
    /// Full URL; overrides the gridpoint URL built from office/grid.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default)]
    pub from: String,
    #[serde(default = "default_fetch_timeout")]
    pub timeout_seconds: u64,
    #[serde(default = "default_forecast_interval")]
    pub poll_interval_minutes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RadarConfig {
    #[serde(default = "default_radar_url")]
    pub url: String,
    #[serde(default = "default_fetch_timeout")]
    pub timeout_seconds: u64,
    #[serde(default = "default_radar_interval")]
    pub poll_interval_minutes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_history_days")]
    pub history_days: u64,
    #[serde(default = "default_max_history_rows")]
    pub max_history_rows: u64,
    #[serde(default = "default_series_refresh")]
    pub series_refresh_seconds: u64,
    #[serde(default = "default_gauges_refresh")]
    pub gauges_refresh_seconds: u64,
}

fn default_bind_address() -> String {
    "0.0.0.0:8080".to_string()
}
fn default_request_timeout() -> u64 {
    30
}
fn default_data_dir() -> String {
    "./weather_assets".to_string()
}
fn default_observations_file() -> String {
    "observations/WEATHER_OBSERVATION_dp.csv".to_string()
}
fn default_forecast_dir() -> String {
    "forecast".to_string()
}
fn default_radar_file() -> String {
    "dashboard/assets/radar.gif".to_string()
}
fn default_timezone() -> String {
    "US/Central".to_string()
}
fn default_office() -> String {
    "LSX".to_string()
}
fn default_grid_x() -> u32 {
    103
}
fn default_grid_y() -> u32 {
    81
}
fn default_user_agent() -> String {
    format!("wx-station/{}", env!("CARGO_PKG_VERSION"))
}
fn default_fetch_timeout() -> u64 {
    30
}
fn default_forecast_interval() -> u64 {
    60
}
fn default_radar_url() -> String {
    "https://radar.weather.gov/ridge/standard/KLSX_loop.gif".to_string()
}
fn default_radar_interval() -> u64 {
    10
}
fn default_history_days() -> u64 {
    3
}
fn default_max_history_rows() -> u64 {
    4000
}
fn default_series_refresh() -> u64 {
    300
}
fn default_gauges_refresh() -> u64 {
    15
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            passkey: None,
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            observations_file: default_observations_file(),
            forecast_dir: default_forecast_dir(),
            radar_file: default_radar_file(),
        }
    }
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            office: default_office(),
            grid_x: default_grid_x(),
            grid_y: default_grid_y(),
            endpoint: None,
            user_agent: default_user_agent(),
            from: String::new(),
            timeout_seconds: default_fetch_timeout(),
            poll_interval_minutes: default_forecast_interval(),
        }
    }
}

impl Default for RadarConfig {
    fn default() -> Self {
        Self {
            url: default_radar_url(),
            timeout_seconds: default_fetch_timeout(),
            poll_interval_minutes: default_radar_interval(),
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            history_days: default_history_days(),
            max_history_rows: default_max_history_rows(),
            series_refresh_seconds: default_series_refresh(),
            gauges_refresh_seconds: default_gauges_refresh(),
        }
    }
}

impl StationConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(WxError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| WxError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${STATION_PASSKEY})
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| WxError::ConfigError {
            message: format!("env substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn forecast_endpoint(&self) -> String {
        match &self.forecast.endpoint {
            Some(endpoint) => endpoint.clone(),
            None => format!(
                "{}/gridpoints/{}/{},{}/forecast/hourly",
                DEFAULT_NWS_BASE_URL, self.forecast.office, self.forecast.grid_x, self.forecast.grid_y
            ),
        }
    }

    pub fn timezone(&self) -> Result<chrono_tz::Tz> {
        validation::timezone("location.timezone", &self.location.timezone)
    }

    pub fn forecast_predictions_path(&self) -> String {
        format!("{}/FORECAST_PREDICTIONS.csv", self.storage.forecast_dir)
    }

    pub fn forecast_descriptions_path(&self) -> String {
        format!("{}/FORECAST_DESCRIPTIONS.csv", self.storage.forecast_dir)
    }

    pub fn forecast_icons_path(&self) -> String {
        format!("{}/FORECAST_ICONS.csv", self.storage.forecast_dir)
    }

    pub fn validate_config(&self) -> Result<()> {
        if self.server.bind_address.parse::<std::net::SocketAddr>().is_err() {
            return Err(WxError::InvalidConfigValueError {
                field: "server.bind_address".to_string(),
                value: self.server.bind_address.clone(),
                reason: "Expected host:port, e.g. 0.0.0.0:8080".to_string(),
            });
        }
        validation::at_least_one("server.request_timeout_seconds", self.server.request_timeout_seconds)?;

        validation::directory("storage.data_dir", &self.storage.data_dir)?;
        validation::data_file("storage.observations_file", &self.storage.observations_file)?;
        validation::data_file("storage.forecast_dir", &self.storage.forecast_dir)?;
        validation::data_file("storage.radar_file", &self.storage.radar_file)?;

        validation::required_text("location.name", &self.location.name)?;
        validation::coordinate("location.latitude", self.location.latitude, 90.0)?;
        validation::coordinate("location.longitude", self.location.longitude, 180.0)?;
        self.timezone()?;

        validation::http_url("forecast.endpoint", &self.forecast_endpoint())?;
        // api.weather.gov rejects requests without a User-Agent
        validation::required_text("forecast.user_agent", &self.forecast.user_agent)?;
        validation::at_least_one("forecast.timeout_seconds", self.forecast.timeout_seconds)?;
        validation::at_least_one("forecast.poll_interval_minutes", self.forecast.poll_interval_minutes)?;

        validation::http_url("radar.url", &self.radar.url)?;
        validation::at_least_one("radar.timeout_seconds", self.radar.timeout_seconds)?;
        validation::at_least_one("radar.poll_interval_minutes", self.radar.poll_interval_minutes)?;

        validation::at_least_one("dashboard.history_days", self.dashboard.history_days)?;
        validation::at_least_one("dashboard.max_history_rows", self.dashboard.max_history_rows)?;
        validation::at_least_one("dashboard.series_refresh_seconds", self.dashboard.series_refresh_seconds)?;
        validation::at_least_one("dashboard.gauges_refresh_seconds", self.dashboard.gauges_refresh_seconds)?;

        Ok(())
    }
}

impl Validate for StationConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MINIMAL: &str = r#"
[location]
name = "Edwardsville"
latitude = 38.78296
longitude = -89.93201
"#;

    #[test]
    fn test_parse_minimal_config_fills_defaults() {
        let config = StationConfig::from_toml_str(MINIMAL).unwrap();

        assert_eq!(config.location.name, "Edwardsville");
        assert_eq!(config.location.timezone, "US/Central");
        assert_eq!(config.server.bind_address, "0.0.0.0:8080");
        assert_eq!(config.dashboard.max_history_rows, 4000);
        assert_eq!(
            config.forecast_endpoint(),
            "https://api.weather.gov/gridpoints/LSX/103,81/forecast/hourly"
        );
        assert_eq!(
            config.forecast_predictions_path(),
            "forecast/FORECAST_PREDICTIONS.csv"
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("WX_TEST_PASSKEY", "ABC123");

        let toml_content = format!("{}\n[server]\npasskey = \"${{WX_TEST_PASSKEY}}\"\n", MINIMAL);
        let config = StationConfig::from_toml_str(&toml_content).unwrap();
        assert_eq!(config.server.passkey.as_deref(), Some("ABC123"));

        std::env::remove_var("WX_TEST_PASSKEY");
    }

    #[test]
    fn test_endpoint_override() {
        let toml_content = format!(
            "{}\n[forecast]\nendpoint = \"http://127.0.0.1:9999/hourly\"\n",
            MINIMAL
        );
        let config = StationConfig::from_toml_str(&toml_content).unwrap();
        assert_eq!(config.forecast_endpoint(), "http://127.0.0.1:9999/hourly");
    }

    #[test]
    fn test_config_validation_rejects_bad_values() {
        let bad_lat = MINIMAL.replace("38.78296", "123.0");
        let config = StationConfig::from_toml_str(&bad_lat).unwrap();
        assert!(config.validate().is_err());

        let bad_tz = format!("{}timezone = \"Nowhere/Special\"\n", MINIMAL);
        let config = StationConfig::from_toml_str(&bad_tz).unwrap();
        assert!(config.validate().is_err());

        let bad_radar = format!("{}\n[radar]\nurl = \"not a url\"\n", MINIMAL);
        let config = StationConfig::from_toml_str(&bad_radar).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_blank_station_name_is_missing() {
        let blank_name = MINIMAL.replace("\"Edwardsville\"", "\"  \"");
        let config = StationConfig::from_toml_str(&blank_name).unwrap();
        assert!(matches!(
            config.validate(),
            Err(WxError::MissingConfigError { field }) if field == "location.name"
        ));

        let escaping = format!("{}\n[storage]\nradar_file = \"../radar.gif\"\n", MINIMAL);
        let config = StationConfig::from_toml_str(&escaping).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_location_is_a_parse_error() {
        let result = StationConfig::from_toml_str("[server]\nbind_address = \"0.0.0.0:1\"\n");
        assert!(matches!(
            result,
            Err(WxError::ConfigValidationError { .. })
        ));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(MINIMAL.as_bytes()).unwrap();

        let config = StationConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.location.latitude, 38.78296);
    }
}
