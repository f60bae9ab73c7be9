// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Demo configuration loaded from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use floorview_selector::SelectorConfig;

/// Demo configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// AEC model data to derive levels from. The bundled sample is used when
    /// unset.
    pub data_path: Option<PathBuf>,
    /// Simulated frame interval in milliseconds.
    pub tick_ms: u64,
    /// Upper bound on simulated frames per animation.
    pub max_frames: usize,
    pub selector: SelectorConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            data_path: std::env::var_os("FLOORVIEW_DATA").map(PathBuf::from),
            tick_ms: std::env::var("FLOORVIEW_TICK_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|&ms| ms > 0)
                .unwrap_or(defaults.tick_ms),
            max_frames: std::env::var("FLOORVIEW_MAX_FRAMES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_frames),
            selector: SelectorConfig::from_env(),
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_path: None,
            tick_ms: 16,
            max_frames: 600,
            selector: SelectorConfig::default(),
        }
    }
}
