use std::path::PathBuf;

use rfqmatch_core::{EngineConfig, LoadOptions};

use super::CommandResult;

pub fn run(config_path: Option<PathBuf>) -> CommandResult {
    let source = match &config_path {
        Some(path) => format!("file `{}` plus RFQMATCH_* env overrides", path.display()),
        None => "defaults plus RFQMATCH_* env overrides".to_string(),
    };

    match EngineConfig::load(LoadOptions {
        config_path: config_path.clone(),
        require_file: config_path.is_some(),
    }) {
        Ok(config) => CommandResult::success_with_data(
            "config",
            format!("effective configuration ({source})"),
            config,
        ),
        Err(error) => CommandResult::failure("config", "config_validation", error.to_string(), 2),
    }
}
