pub mod model;
pub mod scenarios;
pub mod workbook;

use cashflow_core::EngineConfig;
use tracing::debug;

use crate::input;

/// Engine configuration from `--config`, or the defaults.
pub fn load_config(path: Option<&str>) -> Result<EngineConfig, Box<dyn std::error::Error>> {
    match path {
        Some(path) => {
            let source = input::file::read_text(path)?;
            let config = EngineConfig::from_toml_str(&source)?;
            debug!("loaded engine config from {path}");
            Ok(config)
        }
        None => Ok(EngineConfig::default()),
    }
}
