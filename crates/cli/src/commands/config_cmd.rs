//! `devassist config`: print configuration as TOML.

use devassist_config::AppConfig;
use std::path::Path;

use super::{CmdResult, load_config};

pub fn show(config_path: Option<&Path>, effective: bool) -> CmdResult {
    if !effective {
        print!("{}", AppConfig::default_toml());
        return Ok(());
    }

    let config = load_config(config_path)?;
    let source = config_path.map_or_else(|| AppConfig::config_dir().join("config.toml"), Path::to_path_buf);
    println!("# {}", source.display());
    println!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}
