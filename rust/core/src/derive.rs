// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Level derivation from building-story metadata
//!
//! Turns the `levels` array of AEC model data into world-space [`Floor`]s:
//!
//! 1. Levels explicitly flagged as non-building-stories are dropped.
//! 2. Each remaining story spans from its own elevation (moved down by
//!    [`LEVEL_Z_OFFSET`]) to the elevation of the next story. The topmost
//!    story ends at `elevation + height`.
//! 3. Elevations are mapped from project to world space, either through the
//!    model placement or the metadata's reference point transform, and then
//!    through the model transform if one is set.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::floor::{DbId, Floor, ModelId};
use crate::space::{Elevation, ProjectSpace, SpaceTransform, WorldSpace};

/// Downward shift applied to every story's lower bound.
///
/// Without it, the slab of the lowest visible story sits exactly on the cut
/// plane and is frequently clipped away.
pub const LEVEL_Z_OFFSET: f64 = 1.0 / 12.0;

/// Optional per-level attributes written by the authoring tool.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelExtension {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub building_story: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_elevation: Option<f64>,
}

/// A level as stored in AEC model data (project coordinates).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLevel {
    pub guid: String,
    pub name: String,
    pub elevation: f64,
    #[serde(default)]
    pub height: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension: Option<LevelExtension>,
}

impl RawLevel {
    /// Levels without the flag count as building stories.
    pub fn is_building_story(&self) -> bool {
        self.extension
            .as_ref()
            .and_then(|ext| ext.building_story)
            .unwrap_or(true)
    }

    /// Project elevation if present, otherwise the plain elevation.
    pub fn project_elevation(&self) -> Elevation<ProjectSpace> {
        let z = self
            .extension
            .as_ref()
            .and_then(|ext| ext.project_elevation)
            .unwrap_or(self.elevation);
        Elevation::new(z)
    }
}

/// The parts of AEC model data this crate consumes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AecModelData {
    /// Levels, sorted ascending by elevation.
    #[serde(default)]
    pub levels: Vec<RawLevel>,
    /// Project-to-viewer transform as 12 floats (column-major 3x4).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_point_transformation: Option<Vec<f64>>,
    /// Floor and ceiling objects that bleed into adjacent stories.
    #[serde(default)]
    pub level_occluder_ids: Vec<DbId>,
}

impl AecModelData {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Converts AEC level metadata into world-space floors.
///
/// `placement` maps project coordinates into the viewer and wins over the
/// metadata's own reference point transform. Without either, project and
/// world coordinates are assumed to coincide.
pub fn aec_model_data_to_levels(
    data: &AecModelData,
    placement: Option<&SpaceTransform<ProjectSpace, WorldSpace>>,
    model_transform: Option<&SpaceTransform<WorldSpace, WorldSpace>>,
) -> Result<Vec<Floor>> {
    let stories: Vec<&RawLevel> = data
        .levels
        .iter()
        .filter(|level| level.is_building_story())
        .collect();

    let to_world = match placement {
        Some(tf) => tf.clone(),
        None => match &data.ref_point_transformation {
            Some(values) => SpaceTransform::from_array12(values)?,
            None => SpaceTransform::identity(),
        },
    };
    let to_world = match model_transform {
        Some(model_tf) => to_world.then(model_tf),
        None => to_world,
    };

    let mut floors = Vec::with_capacity(stories.len());
    for (index, level) in stories.iter().enumerate() {
        let bottom = level.project_elevation();
        let top = match stories.get(index + 1) {
            Some(next) => next.project_elevation(),
            // Topmost story: its own height defines the upper boundary.
            None => bottom.offset(level.height),
        };

        let z_min = to_world.apply(bottom.offset(-LEVEL_Z_OFFSET));
        let z_max = to_world.apply(top);

        floors.push(Floor::new(
            floors.len(),
            level.guid.clone(),
            level.name.clone(),
            z_min.value(),
            z_max.value(),
        ));
    }

    Ok(floors)
}

/// What the host knows about a loaded model when picking the one that
/// defines the levels.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelCandidate {
    pub id: ModelId,
    pub is_2d: bool,
    pub has_document: bool,
    pub has_aec_data: bool,
    /// Size of the source document, if known.
    pub size: Option<u64>,
}

/// Picks the largest 3D model as the main model.
///
/// Candidates without a document node are skipped, as are candidates without
/// AEC data unless `ignore_aec_model_data` is set. A model of unknown size is
/// only taken while nothing else has been chosen.
pub fn choose_main_model(candidates: &[ModelCandidate], ignore_aec_model_data: bool) -> Option<ModelId> {
    let mut main_model = None;
    let mut main_size: i128 = -1;

    for candidate in candidates {
        if candidate.is_2d || !candidate.has_document {
            continue;
        }
        if !ignore_aec_model_data && !candidate.has_aec_data {
            continue;
        }

        match candidate.size {
            Some(size) if i128::from(size) > main_size => {
                main_model = Some(candidate.id);
                main_size = i128::from(size);
            }
            None if main_size == -1 => {
                main_model = Some(candidate.id);
                main_size = 0;
            }
            _ => {}
        }
    }

    main_model
}

/// Collects the level occluder ids of every model that carries AEC data.
pub fn model_data_occluders<'a>(
    models: impl IntoIterator<Item = (ModelId, &'a AecModelData)>,
) -> FxHashMap<ModelId, Vec<DbId>> {
    models
        .into_iter()
        .map(|(id, data)| (id, data.level_occluder_ids.clone()))
        .collect()
}
