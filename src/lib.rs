pub mod api;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use api::{create_router, AppState};
pub use config::{LocalStorage, StationConfig};
pub use core::{
    etl::EtlEngine, forecast::ForecastPipeline, observations::ObservationLog, radar::RadarFetcher,
};
pub use utils::error::{Result, WxError};
