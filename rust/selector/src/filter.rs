// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Elevation-band object filtering
//!
//! Hides floor and ceiling objects of adjacent stories that bleed into the
//! selected floor. For a floor `[z_min, z_max]` with height `h = z_max - z_min`
//! the filter band is:
//!
//! ```text
//! [z_min + h * level_height_factor, z_max + h * 0.1]
//! ```
//!
//! A candidate object is hidden if its box min or max z lies inside the band,
//! or if the box encloses the band. Results are cached per floor name and
//! model, so re-selecting a floor never re-queries bounding boxes.

use floorview_core::{DbId, Floor, ModelId, ZRange};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::viewer::ModelScene;

/// Used when the filter data does not specify a factor.
pub const DEFAULT_LEVEL_HEIGHT_FACTOR: f64 = 0.5;

/// Fraction of the floor height the band extends above `z_max`.
const UPPER_BAND_EXTENSION: f64 = 0.1;

/// Candidate objects per model plus the band heuristic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FloorFilterData {
    pub models_db_ids: FxHashMap<ModelId, Vec<DbId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level_height_factor: Option<f64>,
}

impl FloorFilterData {
    pub fn new(models_db_ids: FxHashMap<ModelId, Vec<DbId>>) -> Self {
        Self {
            models_db_ids,
            level_height_factor: None,
        }
    }

    pub fn with_level_height_factor(mut self, factor: f64) -> Self {
        self.level_height_factor = Some(factor);
        self
    }

    /// Parse and validate filter data.
    ///
    /// ```json
    /// { "modelsDbIds": { "1": [10, 11] }, "levelHeightFactor": 0.6 }
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        let data: Self = serde_json::from_str(json)?;
        data.validate()?;
        Ok(data)
    }

    /// The configured factor, or [`DEFAULT_LEVEL_HEIGHT_FACTOR`].
    pub fn level_height_factor(&self) -> Result<f64> {
        match self.level_height_factor {
            None => Ok(DEFAULT_LEVEL_HEIGHT_FACTOR),
            Some(h) if (0.0..1.0).contains(&h) => Ok(h),
            Some(h) => Err(Error::InvalidLevelHeightFactor(h)),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.level_height_factor().map(|_| ())
    }

    /// Whether any model lists at least one candidate.
    pub fn has_model_db_ids(&self) -> bool {
        self.models_db_ids.values().any(|ids| !ids.is_empty())
    }
}

/// Band of `floor` that the filter hides objects from.
pub fn filter_band(floor: &Floor, level_height_factor: f64) -> ZRange {
    let height = floor.height();
    ZRange::new(
        floor.z_min + height * level_height_factor,
        floor.z_max + height * UPPER_BAND_EXTENSION,
    )
}

#[inline]
fn overlaps_band(band: &ZRange, node: &ZRange) -> bool {
    band.contains(node.min) || band.contains(node.max) || (node.min <= band.min && node.max >= band.max)
}

/// Per-floor cache of hidden objects plus the currently applied hide-set.
///
/// Every id in the applied hide-set is hidden in its model's visibility
/// state; [`FloorFilter::clear_filter`] shows them again before dropping
/// the entry.
#[derive(Debug, Default)]
pub struct FloorFilter {
    cache: FxHashMap<String, FxHashMap<ModelId, FxHashSet<DbId>>>,
    db_ids_to_unhide: FxHashMap<ModelId, FxHashSet<DbId>>,
}

impl FloorFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hide the candidates of every visible model that overlap the band of
    /// `floor`. Returns the number of models the filter was applied to.
    ///
    /// Models whose visibility control or instance tree is not available
    /// yet are skipped with a warning.
    pub fn filter<S>(&mut self, scene: &mut S, data: &FloorFilterData, floor: &Floor) -> Result<usize>
    where
        S: ModelScene + ?Sized,
    {
        let level_height_factor = data.level_height_factor()?;
        if !data.has_model_db_ids() {
            return Ok(0);
        }

        let band = filter_band(floor, level_height_factor);
        let mut applied = 0;

        for model in scene.visible_models() {
            if scene.visibility_control(model).is_none() {
                tracing::warn!(model = %model, "visibility control not yet initialized, skipping floor filter");
                continue;
            }

            let cached = self
                .cache
                .get(&floor.name)
                .and_then(|per_model| per_model.get(&model))
                .cloned();
            if let Some(cached) = cached {
                if !cached.is_empty() {
                    self.hide_db_ids(scene, model, &cached);
                }
                applied += 1;
                continue;
            }

            let to_hide: FxHashSet<DbId> = {
                let Some(tree) = scene.instance_tree(model) else {
                    tracing::warn!(model = %model, "instance tree not yet loaded, skipping floor filter");
                    continue;
                };
                let Some(candidates) = data.models_db_ids.get(&model) else {
                    continue;
                };
                candidates
                    .iter()
                    .copied()
                    .filter(|&id| {
                        tree.node_box(id)
                            .map_or(false, |node| overlaps_band(&band, &node.z_range()))
                    })
                    .collect()
            };

            if !to_hide.is_empty() {
                self.hide_db_ids(scene, model, &to_hide);
            }
            tracing::debug!(model = %model, floor = %floor.name, hidden = to_hide.len(), "floor filter evaluated");

            self.cache
                .entry(floor.name.clone())
                .or_default()
                .insert(model, to_hide);
            applied += 1;
        }

        Ok(applied)
    }

    /// Hide `ids` in `model` and remember them for [`FloorFilter::clear_filter`].
    pub fn hide_db_ids<S>(&mut self, scene: &mut S, model: ModelId, ids: &FxHashSet<DbId>)
    where
        S: ModelScene + ?Sized,
    {
        let Some(visibility) = scene.visibility_control(model) else {
            return;
        };
        for &id in ids {
            visibility.set_node_off(id, true);
        }
        self.db_ids_to_unhide
            .entry(model)
            .or_default()
            .extend(ids.iter().copied());
    }

    /// Show every hidden object again.
    ///
    /// Models whose visibility control is not reachable keep their entry so
    /// that a later call can still restore them.
    pub fn clear_filter<S>(&mut self, scene: &mut S)
    where
        S: ModelScene + ?Sized,
    {
        if self.db_ids_to_unhide.is_empty() {
            return;
        }

        let models: Vec<ModelId> = self.db_ids_to_unhide.keys().copied().collect();
        for model in models {
            let Some(visibility) = scene.visibility_control(model) else {
                continue;
            };
            if let Some(ids) = self.db_ids_to_unhide.remove(&model) {
                for id in ids {
                    visibility.set_node_off(id, false);
                }
            }
        }
    }

    /// Forget the hide-set of an unloaded model without touching its
    /// visibility state.
    pub fn unhide_model(&mut self, model: ModelId) {
        self.db_ids_to_unhide.remove(&model);
    }

    /// Hide the current hide-set of `model` again, e.g. after its
    /// visibility state was reset by the host.
    pub fn reapply_filter<S>(&self, scene: &mut S, model: ModelId)
    where
        S: ModelScene + ?Sized,
    {
        let Some(ids) = self.db_ids_to_unhide.get(&model) else {
            return;
        };
        let Some(visibility) = scene.visibility_control(model) else {
            return;
        };
        for &id in ids {
            visibility.set_node_off(id, true);
        }
    }

    pub fn is_visible(&self, model: ModelId, id: DbId) -> bool {
        self.db_ids_to_unhide
            .get(&model)
            .map_or(true, |ids| !ids.contains(&id))
    }

    /// Currently hidden ids of `model`.
    pub fn hidden_ids(&self, model: ModelId) -> Option<&FxHashSet<DbId>> {
        self.db_ids_to_unhide.get(&model)
    }

    pub fn is_cached(&self, floor_name: &str, model: ModelId) -> bool {
        self.cache
            .get(floor_name)
            .map_or(false, |per_model| per_model.contains_key(&model))
    }

    pub fn reset_cache(&mut self) {
        self.cache.clear();
    }
}
