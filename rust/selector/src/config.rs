// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tunables of the floor selector.

use std::time::Duration;

use serde::{Deserialize, Serialize};

const DEFAULT_FADING_TIME_SECS: f64 = 0.5;

/// Floor selector configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SelectorConfig {
    /// Duration of ghost-floor fades and floor transitions, in seconds.
    pub fading_time_secs: f64,
    /// Opacity of ghost floors once fully faded in.
    pub max_ghost_opacity: f64,
    /// Time budget for rendering the frozen snapshot of the selected floor.
    /// `None` uses the renderer's regular frame budget.
    pub offscreen_render_budget_ms: Option<u64>,
}

impl SelectorConfig {
    /// Load configuration from environment variables, falling back to the
    /// defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            fading_time_secs: std::env::var("FLOORVIEW_FADING_TIME_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v: &f64| *v >= 0.0 && Duration::try_from_secs_f64(*v).is_ok())
                .unwrap_or(defaults.fading_time_secs),
            max_ghost_opacity: std::env::var("FLOORVIEW_MAX_GHOST_OPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v: &f64| (0.0..=1.0).contains(v))
                .unwrap_or(defaults.max_ghost_opacity),
            offscreen_render_budget_ms: std::env::var("FLOORVIEW_OFFSCREEN_BUDGET_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .or(defaults.offscreen_render_budget_ms),
        }
    }

    /// Negative values mean no fading. Values too large for a [`Duration`]
    /// fall back to the default.
    pub fn fading_time(&self) -> Duration {
        Duration::try_from_secs_f64(self.fading_time_secs.max(0.0))
            .unwrap_or_else(|_| Duration::from_secs_f64(DEFAULT_FADING_TIME_SECS))
    }

    pub fn offscreen_render_budget(&self) -> Option<Duration> {
        self.offscreen_render_budget_ms.map(Duration::from_millis)
    }
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            fading_time_secs: DEFAULT_FADING_TIME_SECS,
            max_ghost_opacity: 0.2,
            offscreen_render_budget_ms: None,
        }
    }
}
