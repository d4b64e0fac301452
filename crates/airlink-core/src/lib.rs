pub mod constants;
pub mod error;
pub mod params;
pub mod types;

pub use error::{Error, Result};
pub use params::{OperatingMode, ParameterName, ParameterSet, ParameterValue};
pub use types::*;
