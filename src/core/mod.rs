pub mod dashboard;
pub mod dewpoint;
pub mod etl;
pub mod forecast;
pub mod lookup;
pub mod observations;
pub mod radar;
pub mod riseset;
pub mod table;

pub use crate::domain::ports::{Pipeline, Storage};
pub use crate::utils::error::Result;
