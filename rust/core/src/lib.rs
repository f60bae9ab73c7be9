// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # floorview Core
//!
//! Level data for floor isolation in BIM model viewers.
//!
//! ## Overview
//!
//! - **Floors**: ordered, world-space elevation bands, one per building story
//! - **Coordinate spaces**: project vs. world elevations as distinct types
//! - **Level derivation**: building-story metadata to floors, including the
//!   placement and model transforms of the hosting model
//! - **Helpers**: camera-to-level mapping and plan section ranges
//!
//! ## Quick Start
//!
//! ```rust
//! use floorview_core::{aec_model_data_to_levels, AecModelData};
//!
//! let json = r#"{
//!     "levels": [
//!         { "guid": "a", "name": "Ground", "elevation": 0.0, "height": 3.0 },
//!         { "guid": "b", "name": "First", "elevation": 3.0, "height": 3.0 }
//!     ]
//! }"#;
//!
//! let data = AecModelData::from_json(json).unwrap();
//! let floors = aec_model_data_to_levels(&data, None, None).unwrap();
//! assert_eq!(floors.len(), 2);
//! assert_eq!(floors[1].z_max, 6.0);
//! ```

pub mod derive;
pub mod error;
pub mod floor;
pub mod space;

pub use derive::{
    aec_model_data_to_levels, choose_main_model, model_data_occluders, AecModelData,
    LevelExtension, ModelCandidate, RawLevel, LEVEL_Z_OFFSET,
};
pub use error::{Error, Result};
pub use floor::{
    level_z_range, map_camera_to_level, normalize_floors, DbId, Floor, ModelId, WorldBox, ZRange,
};
pub use space::{Elevation, ProjectSpace, SpaceTransform, WorldSpace};
