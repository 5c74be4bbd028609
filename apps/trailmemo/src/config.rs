use std::{fs, path::Path};

use map_controller::{
    session::DEFAULT_LOAD_LIMIT,
    viewport::{DEFAULT_CENTER, DEFAULT_ZOOM},
    SessionConfig, ViewportConfig,
};
use serde::Deserialize;
use shared::domain::{Coordinates, UserId};
use tracing::warn;

pub const SETTINGS_FILE: &str = "trailmemo.toml";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub server_url: String,
    pub auth_token: Option<String>,
    pub user_id: Option<UserId>,
    pub default_center: Coordinates,
    pub default_zoom: f64,
    pub load_limit: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8000/api/v1".into(),
            auth_token: None,
            user_id: None,
            default_center: DEFAULT_CENTER,
            default_zoom: DEFAULT_ZOOM,
            load_limit: DEFAULT_LOAD_LIMIT,
        }
    }
}

impl Settings {
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            viewport: ViewportConfig {
                default_center: self.default_center,
                default_zoom: self.default_zoom,
            },
            load_limit: self.load_limit,
            current_user: self.user_id.clone(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    server_url: Option<String>,
    auth_token: Option<String>,
    user_id: Option<String>,
    default_map_lat: Option<f64>,
    default_map_lng: Option<f64>,
    default_map_zoom: Option<f64>,
    load_limit: Option<u32>,
}

pub fn load_settings() -> Settings {
    load_settings_from(Path::new(SETTINGS_FILE), |key| std::env::var(key).ok())
}

/// Defaults, then the settings file if it exists, then environment overrides.
pub fn load_settings_from(path: &Path, env: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        match toml::from_str::<FileSettings>(&raw) {
            Ok(file_cfg) => apply_file(&mut settings, file_cfg),
            Err(err) => warn!(path = %path.display(), "ignoring unreadable settings file: {err}"),
        }
    }

    if let Some(v) = env("TRAILMEMO_SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = env("TRAILMEMO_AUTH_TOKEN") {
        settings.auth_token = Some(v).filter(|t| !t.trim().is_empty());
    }
    if let Some(v) = env("TRAILMEMO_USER_ID") {
        settings.user_id = Some(UserId::new(v));
    }
    if let Some(lat) = parsed::<f64>(&env, "TRAILMEMO_DEFAULT_MAP_LAT") {
        settings.default_center.latitude = lat;
    }
    if let Some(lng) = parsed::<f64>(&env, "TRAILMEMO_DEFAULT_MAP_LNG") {
        settings.default_center.longitude = lng;
    }
    if let Some(zoom) = parsed::<f64>(&env, "TRAILMEMO_DEFAULT_MAP_ZOOM") {
        settings.default_zoom = zoom;
    }
    if let Some(limit) = parsed::<u32>(&env, "TRAILMEMO_LOAD_LIMIT") {
        settings.load_limit = limit;
    }

    if !settings.default_center.is_valid() {
        warn!(
            lat = settings.default_center.latitude,
            lng = settings.default_center.longitude,
            "default map centre out of range; using built-in centre"
        );
        settings.default_center = DEFAULT_CENTER;
    }

    settings
}

fn apply_file(settings: &mut Settings, file_cfg: FileSettings) {
    if let Some(v) = file_cfg.server_url {
        settings.server_url = v;
    }
    if let Some(v) = file_cfg.auth_token {
        settings.auth_token = Some(v);
    }
    if let Some(v) = file_cfg.user_id {
        settings.user_id = Some(UserId::new(v));
    }
    if let Some(v) = file_cfg.default_map_lat {
        settings.default_center.latitude = v;
    }
    if let Some(v) = file_cfg.default_map_lng {
        settings.default_center.longitude = v;
    }
    if let Some(v) = file_cfg.default_map_zoom {
        settings.default_zoom = v;
    }
    if let Some(v) = file_cfg.load_limit {
        settings.load_limit = v;
    }
}

fn parsed<T: std::str::FromStr>(env: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = env(key)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "ignoring malformed numeric override");
            None
        }
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
