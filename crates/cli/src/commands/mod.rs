pub mod config_cmd;
pub mod inspect;
pub mod memory;
pub mod plan;
pub mod run;

use devassist_config::AppConfig;
use std::path::Path;

pub type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Load the config from `path` if given, otherwise from the default location.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let config = match path {
        Some(path) => {
            let mut config = AppConfig::load_from(path)?;
            config.apply_env(|key| std::env::var(key).ok())?;
            config.validate()?;
            config
        }
        None => AppConfig::load()?,
    };
    Ok(config)
}
