// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Levels extension: host glue around the [`FloorSelector`].
//!
//! Maps viewer notifications ([`HostEvent`]) and level panel interaction to
//! selector calls, derives floors from the level source of the main model,
//! tracks the level the camera is on and persists the selected level.

use std::time::Duration;

use floorview_core::{
    aec_model_data_to_levels, level_z_range, map_camera_to_level, model_data_occluders, AecModelData,
    Floor, ModelId, ProjectSpace, SpaceTransform, WorldSpace, ZRange,
};
use nalgebra::Point3;
use serde::{Deserialize, Deserializer, Serialize};

use crate::config::SelectorConfig;
use crate::error::Result;
use crate::events::{EventBus, LevelsEvent, ListenerKey};
use crate::filter::FloorFilterData;
use crate::selector::{FloorSelector, RollOver};
use crate::viewer::Viewer;

/// Where the floors come from.
#[derive(Debug, Clone, PartialEq)]
pub enum LevelSource {
    /// Level metadata in project coordinates.
    Aec(AecModelData),
    /// Floors already in world coordinates, e.g. generated from viewports.
    World(Vec<Floor>),
}

/// Viewer notifications the extension reacts to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HostEvent {
    CameraChanged { position: Point3<f64> },
    ViewerResized,
    RenderOptionsChanged,
    ModelAdded { model: ModelId },
    ObjectTreeCreated { model: ModelId },
    ModelUnloaded { model: ModelId },
    ModelTransformChanged { model: ModelId },
    CrossFadePreempted,
}

/// Entry of the level panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelItem {
    pub text: String,
    pub index: usize,
}

/// Persisted level selection.
///
/// `floor_guid` distinguishes three cases: absent (`None`) keeps the current
/// selection, `Some(None)` (JSON `null`) selects all floors and
/// `Some(Some(guid))` selects the floor with that guid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelsState {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_present"
    )]
    pub floor_guid: Option<Option<String>>,
}

fn deserialize_present<'de, D>(deserializer: D) -> std::result::Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

pub struct LevelsExtension<V: Viewer> {
    selector: FloorSelector<V>,
    source: Option<LevelSource>,
    current_model: Option<ModelId>,
    /// Fallback placement for models that do not provide one.
    floor_data_transform: Option<SpaceTransform<ProjectSpace, WorldSpace>>,
    camera_z: Option<f64>,
    current_level: Option<Floor>,
    hovered_item: Option<usize>,
    events: EventBus<LevelsEvent>,
}

impl<V: Viewer> LevelsExtension<V> {
    pub fn new(viewer: V, config: SelectorConfig) -> Self {
        let mut extension = Self {
            selector: FloorSelector::new(viewer, config),
            source: None,
            current_model: None,
            floor_data_transform: None,
            camera_z: None,
            current_level: None,
            hovered_item: None,
            events: EventBus::new(),
        };
        extension.refresh_enabled();
        extension
    }

    pub fn selector(&self) -> &FloorSelector<V> {
        &self.selector
    }

    pub fn selector_mut(&mut self) -> &mut FloorSelector<V> {
        &mut self.selector
    }

    pub fn viewer(&self) -> &V {
        self.selector.viewer()
    }

    pub fn viewer_mut(&mut self) -> &mut V {
        self.selector.viewer_mut()
    }

    pub fn level_source(&self) -> Option<&LevelSource> {
        self.source.as_ref()
    }

    pub fn current_model(&self) -> Option<ModelId> {
        self.current_model
    }

    /// Sets the level source and the model it belongs to, rebuilding floors
    /// and floor filter data. Unchanged input is ignored.
    pub fn set_level_source(&mut self, source: Option<LevelSource>, model: Option<ModelId>) -> Result<()> {
        if source == self.source && model == self.current_model {
            return Ok(());
        }
        self.source = source;
        self.current_model = model;

        self.update_floors_data()?;
        self.update_occluder_data()
    }

    /// Placement used for AEC data when the model does not provide its own.
    /// Must map into viewer coordinates, including any global offset.
    pub fn set_floor_data_transform(
        &mut self,
        transform: Option<SpaceTransform<ProjectSpace, WorldSpace>>,
    ) -> Result<()> {
        self.floor_data_transform = transform;
        self.update_floors_data()
    }

    /// Rebuilds the floors from the level source and re-applies the current
    /// selection to them.
    pub fn update_floors_data(&mut self) -> Result<()> {
        // set_floor_data resets the selection, so remember it first
        let current_floor = self.selector.current_floor();

        match &self.source {
            Some(LevelSource::World(floors)) => {
                self.selector.set_floor_data(floors.clone())?;
                self.selector.invalidate_floor_selection(current_floor)?;
            }
            Some(LevelSource::Aec(data)) => {
                let viewer = self.selector.viewer();
                let placement = self
                    .current_model
                    .and_then(|model| viewer.placement_transform(model))
                    .or_else(|| self.floor_data_transform.clone());
                let model_transform = self
                    .current_model
                    .and_then(|model| viewer.model_transform(model));

                let floors = aec_model_data_to_levels(data, placement.as_ref(), model_transform.as_ref())?;
                self.selector.set_floor_data(floors)?;
                self.selector.invalidate_floor_selection(current_floor)?;
            }
            None => self.selector.set_floor_data(Vec::new())?,
        }

        tracing::debug!(
            levels = self.selector.floor_data().len(),
            model = ?self.current_model,
            "levels updated"
        );

        // A changed transform may move the camera onto another level.
        self.on_camera_moved();
        Ok(())
    }

    fn update_occluder_data(&mut self) -> Result<()> {
        let data = match (&self.source, self.current_model) {
            (Some(LevelSource::Aec(data)), Some(model)) => {
                Some(FloorFilterData::new(model_data_occluders([(model, data)])))
            }
            _ => None,
        };
        self.selector.set_floor_filter_data(data)
    }

    /// Cut planes only make sense while a 3D model is shown.
    fn refresh_enabled(&mut self) {
        let viewer = self.selector.viewer();
        let is_3d = viewer
            .visible_models()
            .into_iter()
            .any(|model| viewer.is_3d(model));
        self.selector.set_enabled(is_3d);
    }

    pub fn handle_event(&mut self, event: HostEvent) -> Result<()> {
        match event {
            HostEvent::CameraChanged { position } => {
                self.camera_z = Some(position.z);
                self.selector.on_camera_changed();
                self.on_camera_moved();
            }
            HostEvent::ViewerResized => self.selector.on_viewer_resized(),
            HostEvent::RenderOptionsChanged => self.selector.on_render_options_changed(),
            HostEvent::ModelAdded { model } => {
                self.selector.on_model_added(model)?;
                self.refresh_enabled();
            }
            HostEvent::ObjectTreeCreated { model } => self.selector.on_object_tree_created(model)?,
            HostEvent::ModelUnloaded { model } => {
                self.selector.on_model_unloaded(model);
                if self.current_model == Some(model) {
                    tracing::info!(model = %model, "level source model unloaded");
                    self.set_level_source(None, None)?;
                }
                self.refresh_enabled();
            }
            HostEvent::ModelTransformChanged { .. } => self.update_floors_data()?,
            HostEvent::CrossFadePreempted => self.selector.on_cross_fade_preempted(),
        }
        Ok(())
    }

    /// Forwards the frame tick to the selector.
    pub fn tick(&mut self, dt: Duration) {
        self.selector.tick(dt);
    }

    fn on_camera_moved(&mut self) {
        let Some(z) = self.camera_z else {
            return;
        };
        let Some(level) = map_camera_to_level(self.selector.floor_data(), z) else {
            return;
        };

        let changed = self
            .current_level
            .as_ref()
            .map_or(true, |current| current.guid != level.guid);
        if changed {
            let level = level.clone();
            tracing::debug!(level = %level.name, "camera entered level");
            self.current_level = Some(level.clone());
            self.events.emit(&LevelsEvent::LevelChanged { level });
        }
    }

    // ---------------------------------------------------------------------
    // Level panel
    // ---------------------------------------------------------------------

    /// Panel entries, topmost level first.
    pub fn panel_items(&self) -> Vec<LevelItem> {
        self.selector
            .floor_data()
            .iter()
            .enumerate()
            .rev()
            .map(|(index, floor)| LevelItem {
                text: floor.name.clone(),
                index,
            })
            .collect()
    }

    pub fn is_item_selected(&self, item: &LevelItem) -> bool {
        self.selector.current_floor() == Some(item.index)
    }

    /// Hovering the selected item previews "all floors", since clicking it
    /// would deselect it.
    pub fn on_item_mouse_enter(&mut self, index: usize) {
        let target = if self.selector.current_floor() == Some(index) {
            RollOver::AllFloors
        } else {
            RollOver::Floor(index)
        };
        self.selector.roll_over_floor(target);
        self.hovered_item = Some(index);
    }

    pub fn on_item_mouse_leave(&mut self, index: usize) {
        if self.hovered_item == Some(index) {
            self.hovered_item = None;
            self.selector.roll_over_floor(RollOver::None);
        }
    }

    /// Selecting the selected item again shows all floors.
    pub fn on_item_selected(&mut self, index: usize) -> Result<bool> {
        let floor = if self.selector.current_floor() == Some(index) {
            None
        } else {
            Some(index)
        };
        self.selector.select_floor(floor, true)
    }

    pub fn on_panel_mouse_enter(&mut self) {
        self.selector.enter_hover_mode();
    }

    pub fn on_panel_mouse_leave(&mut self) {
        self.selector.exit_hover_mode(false);
    }

    // ---------------------------------------------------------------------
    // State
    // ---------------------------------------------------------------------

    /// Selection state to persist. Left empty while no 3D model is shown.
    pub fn state(&self) -> LevelsState {
        if !self.selector.is_enabled() {
            return LevelsState::default();
        }

        let guid = self
            .selector
            .current_floor()
            .and_then(|index| self.selector.floor_data().get(index))
            .map(|floor| floor.guid.clone());
        LevelsState {
            floor_guid: Some(guid),
        }
    }

    /// Restores a persisted selection without transition. Returns false if
    /// the state carries no selection. Unknown guids are ignored.
    pub fn restore_state(&mut self, state: &LevelsState) -> Result<bool> {
        let Some(floor_guid) = &state.floor_guid else {
            return Ok(false);
        };

        match floor_guid {
            Some(guid) => {
                let index = self
                    .selector
                    .floor_data()
                    .iter()
                    .position(|floor| &floor.guid == guid);
                match index {
                    Some(index) => {
                        self.selector.select_floor(Some(index), false)?;
                    }
                    None => tracing::debug!(guid = %guid, "persisted level not found"),
                }
            }
            None => {
                self.selector.select_floor(None, false)?;
            }
        }
        Ok(true)
    }

    /// The selected level, or the level the camera is on.
    pub fn current_level(&self) -> Option<&Floor> {
        let selected = self
            .selector
            .current_floor()
            .and_then(|index| self.selector.floor_data().get(index));
        selected.or_else(|| map_camera_to_level(self.selector.floor_data(), self.camera_z?))
    }

    /// Section range for a plan-like view of level `index`.
    pub fn z_range(&self, index: usize) -> Option<ZRange> {
        level_z_range(self.selector.floor_data(), index)
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&LevelsEvent) + 'static) -> ListenerKey {
        self.events.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, key: ListenerKey) -> bool {
        self.events.unsubscribe(key)
    }

    /// Drops the selection and hands the viewer back.
    pub fn unload(mut self) -> Result<V> {
        self.selector.select_floor(None, false)?;
        Ok(self.selector.shutdown())
    }
}
