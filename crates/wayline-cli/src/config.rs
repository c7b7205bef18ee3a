//! CLI configuration from environment.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use wayline_osrm::{DEFAULT_BASE_URL, DEFAULT_PROFILE};

#[derive(Debug, Clone)]
pub struct CliConfig {
    pub osrm_url: String,
    pub osrm_profile: String,
    pub geofences_path: PathBuf,
    pub route_timeout: Duration,
}

impl CliConfig {
    pub fn from_env() -> Self {
        Self {
            osrm_url: env::var("WAYLINE_OSRM_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            osrm_profile: env::var("WAYLINE_OSRM_PROFILE")
                .unwrap_or_else(|_| DEFAULT_PROFILE.to_string()),
            geofences_path: env::var("WAYLINE_GEOFENCES")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("config/geofences.json")),
            route_timeout: Duration::from_secs(
                env::var("WAYLINE_ROUTE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
            ),
        }
    }
}
