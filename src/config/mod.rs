// src/config/mod.rs
// Configuration loading

pub mod env;

pub use env::{AssistantSettings, ConfigValidation, EnvConfig};

use std::path::PathBuf;

/// Load ./.env, then ~/.wafaq/.env for anything still unset.
/// Real environment variables always win.
pub fn load_dotenv() {
    let _ = dotenvy::dotenv();
    if let Some(path) = global_dotenv_path() {
        let _ = dotenvy::from_path(path);
    }
}

fn global_dotenv_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".wafaq/.env"))
}
