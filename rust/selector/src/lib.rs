// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # floorview Selector
//!
//! Floor isolation for 3D BIM viewers: select a building story, and the
//! viewer shows only that story with animated cut plane transitions,
//! translucent "ghost floors" while the level panel is hovered, and
//! filtering of adjacent floor and ceiling slabs.
//!
//! ## Overview
//!
//! - [`FloorSelector`]: the render-mode state machine
//! - [`FloorFilter`]: elevation-band object hiding with a per-floor cache
//! - [`LevelsExtension`]: host glue for viewer events, level panel and
//!   persisted state
//! - [`viewer`]: the renderer and scene interfaces the selector drives
//! - [`RecordingViewer`]: in-memory viewer for tests and demos
//!
//! ## Quick Start
//!
//! ```rust
//! use std::time::Duration;
//! use floorview_core::{Floor, ModelId, WorldBox};
//! use floorview_selector::{
//!     FloorSelector, RecordedModel, RecordingViewer, RenderMode, SelectorConfig,
//! };
//!
//! let viewer = RecordingViewer::new()
//!     .with_model(RecordedModel::new(ModelId(1), WorldBox::from_z(0.0, 6.0)));
//! let mut selector = FloorSelector::new(viewer, SelectorConfig::default());
//!
//! selector.set_floor_data(vec![
//!     Floor::new(0, "a", "Ground", 0.0, 3.0),
//!     Floor::new(1, "b", "First", 3.0, 6.0),
//! ]).unwrap();
//!
//! selector.select_floor(Some(1), true).unwrap();
//! assert_eq!(selector.render_mode(), RenderMode::Transition);
//!
//! selector.tick(Duration::from_secs(1));
//! assert_eq!(selector.render_mode(), RenderMode::Off);
//! assert_eq!(selector.floor_section().min, 3.0);
//! ```

pub mod anim;
pub mod config;
pub mod error;
pub mod events;
pub mod extension;
pub mod filter;
pub mod recording;
pub mod selector;
pub mod viewer;

pub use anim::{lerp, smoother_step, AnimationStep, ValueAnimation};
pub use config::SelectorConfig;
pub use error::{Error, Result};
pub use events::{EventBus, LevelsEvent, ListenerKey, SelectorEvent};
pub use extension::{HostEvent, LevelItem, LevelSource, LevelsExtension, LevelsState};
pub use filter::{filter_band, FloorFilter, FloorFilterData, DEFAULT_LEVEL_HEIGHT_FACTOR};
pub use recording::{
    RecordedModel, RecordedTree, RecordedVisibility, RecordingCrossFade, RecordingViewer,
};
pub use selector::{
    FloorSelector, RenderMode, RollOver, CROSS_FADE_OWNER, CUT_PLANE_SET_NAME, MAX_Z_LIMIT,
    MIN_Z_LIMIT,
};
pub use viewer::{
    AoOptions, CrossFade, CutPlane, CutPlanes, FadeLayer, InstanceTree, LayerLease, ModelScene,
    Renderer, RevocationHandle, SpatialFilter, Viewer, VisibilityControl,
};
