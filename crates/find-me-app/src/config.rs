//! Environment-driven runtime configuration.

use std::env;
use std::io::BufRead;
use std::path::PathBuf;

use tracing::{info, warn};

use crate::AppError;

/// Backend used when `FIND_ME_API_URL` is unset.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Runtime configuration for the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Backend base URL.
    pub api_url: String,
    /// Durable session file.
    pub session_file: PathBuf,
    /// Whether the camera bridge may open.
    pub camera_enabled: bool,
}

impl AppConfig {
    /// Loads configuration from the environment, logging each default used.
    pub fn load() -> Self {
        Self {
            api_url: var("FIND_ME_API_URL").unwrap_or_else(|| {
                info!("FIND_ME_API_URL not set, using default: {DEFAULT_API_URL}");
                DEFAULT_API_URL.to_string()
            }),
            session_file: var("FIND_ME_SESSION_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(default_session_file),
            camera_enabled: camera_enabled_from_env(),
        }
    }

    /// Replaces the backend URL (CLI override).
    pub fn with_api_url(mut self, api_url: Option<String>) -> Self {
        if let Some(api_url) = api_url {
            self.api_url = api_url;
        }
        self
    }
}

/// Environment variable holding the account password for CLI commands.
pub const PASSWORD_ENV: &str = "FIND_ME_PASSWORD";

/// Resolves a secret from, in order: the explicit value, `env_key`, then one
/// line of `input`. `prompt` is written to stderr before reading.
///
/// # Errors
/// Returns [`AppError::Input`] when `input` cannot be read or is exhausted.
pub fn read_secret(
    explicit: Option<String>,
    env_key: &str,
    prompt: &str,
    input: &mut impl BufRead,
) -> Result<String, AppError> {
    if let Some(value) = explicit {
        warn!("secret passed on the command line; prefer {env_key} or stdin");
        return Ok(value);
    }
    if let Some(value) = var(env_key) {
        return Ok(value);
    }

    eprint!("{prompt}: ");
    let mut line = String::new();
    let read = input
        .read_line(&mut line)
        .map_err(|error| AppError::Input(format!("{prompt}: {error}")))?;
    if read == 0 {
        return Err(AppError::Input(format!("{prompt}: no input")));
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Checks the camera kill switch.
///
/// Semantics:
/// - Unset => camera enabled.
/// - `0`, `false`, `off` (case-insensitive) => camera disabled.
/// - Any other value => camera enabled.
pub fn camera_enabled_from_env() -> bool {
    match var("FIND_ME_CAMERA_ENABLED") {
        Some(value) => {
            let normalized = value.to_ascii_lowercase();
            !(normalized == "0" || normalized == "false" || normalized == "off")
        }
        None => true,
    }
}

fn var(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => Some(value.trim().to_string()),
        Ok(_) => {
            warn!("{key} is blank, ignoring");
            None
        }
        Err(_) => None,
    }
}

fn default_session_file() -> PathBuf {
    let path = dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("find-me")
        .join("session.json");
    info!("FIND_ME_SESSION_FILE not set, using default: {}", path.display());
    path
}
