// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory [`Viewer`] that records every call.
//!
//! Used by the test suites and the demo binary. It keeps the observable
//! renderer state (cut plane sets, AO options, rollover filter, cross-fade
//! layers) and the per-object state of each model (boxes, hidden ids) as
//! plain public fields.

use std::cell::Cell;
use std::time::Duration;

use floorview_core::{DbId, ModelId, ProjectSpace, SpaceTransform, WorldBox, WorldSpace, ZRange};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::viewer::{
    AoOptions, CrossFade, CutPlanes, FadeLayer, InstanceTree, LayerLease, ModelScene, Renderer,
    RevocationHandle, SpatialFilter, Viewer, VisibilityControl,
};

/// Object boxes of one model. Counts box queries.
#[derive(Debug, Default)]
pub struct RecordedTree {
    pub boxes: FxHashMap<DbId, WorldBox>,
    queries: Cell<usize>,
}

impl RecordedTree {
    pub fn queries(&self) -> usize {
        self.queries.get()
    }
}

impl InstanceTree for RecordedTree {
    fn node_box(&self, db_id: DbId) -> Option<WorldBox> {
        self.queries.set(self.queries.get() + 1);
        self.boxes.get(&db_id).copied()
    }
}

#[derive(Debug, Default)]
pub struct RecordedVisibility {
    pub hidden: FxHashSet<DbId>,
    pub calls: usize,
}

impl VisibilityControl for RecordedVisibility {
    fn set_node_off(&mut self, db_id: DbId, off: bool) {
        self.calls += 1;
        if off {
            self.hidden.insert(db_id);
        } else {
            self.hidden.remove(&db_id);
        }
    }
}

#[derive(Debug)]
pub struct RecordedModel {
    pub id: ModelId,
    pub bounds: WorldBox,
    pub visible: bool,
    pub is_3d: bool,
    /// `None` until the object tree is loaded.
    pub tree: Option<RecordedTree>,
    /// `None` while visibility control is unavailable.
    pub visibility: Option<RecordedVisibility>,
    pub placement: Option<SpaceTransform<ProjectSpace, WorldSpace>>,
    pub transform: Option<SpaceTransform<WorldSpace, WorldSpace>>,
}

impl RecordedModel {
    /// A visible 3D model with an empty, loaded object tree.
    pub fn new(id: ModelId, bounds: WorldBox) -> Self {
        Self {
            id,
            bounds,
            visible: true,
            is_3d: true,
            tree: Some(RecordedTree::default()),
            visibility: Some(RecordedVisibility::default()),
            placement: None,
            transform: None,
        }
    }

    pub fn with_node(mut self, db_id: DbId, node: WorldBox) -> Self {
        self.tree.get_or_insert_with(RecordedTree::default).boxes.insert(db_id, node);
        self
    }

    pub fn without_tree(mut self) -> Self {
        self.tree = None;
        self
    }

    pub fn without_visibility(mut self) -> Self {
        self.visibility = None;
        self
    }

    pub fn as_2d(mut self) -> Self {
        self.is_3d = false;
        self
    }

    pub fn with_placement(mut self, placement: SpaceTransform<ProjectSpace, WorldSpace>) -> Self {
        self.placement = Some(placement);
        self
    }

    pub fn show_all(&mut self) {
        if let Some(visibility) = self.visibility.as_mut() {
            visibility.hidden.clear();
        }
    }
}

/// Cross-fade layer state.
#[derive(Debug)]
pub struct RecordingCrossFade {
    pub owner: Option<String>,
    pub opacity: [f64; 2],
    pub clear_enabled: [bool; 2],
    /// Whether a snapshot image is held by the layer.
    pub images: [bool; 2],
    pub target: Option<FadeLayer>,
    pub sao_heuristic: bool,
    pub snapshot_renders: usize,
    pub last_budget: Option<Duration>,
    /// Whether [`CrossFade::render_fading_image`] reports completion.
    pub render_completes: bool,
    next_lease: u64,
    revocation: Option<RevocationHandle>,
}

impl Default for RecordingCrossFade {
    fn default() -> Self {
        Self {
            owner: None,
            opacity: [0.0; 2],
            clear_enabled: [true; 2],
            images: [false; 2],
            target: None,
            sao_heuristic: true,
            snapshot_renders: 0,
            last_budget: None,
            render_completes: true,
            next_lease: 1,
            revocation: None,
        }
    }
}

impl RecordingCrossFade {
    /// Another consumer takes the layers over.
    pub fn preempt(&mut self, owner: &str) {
        if let Some(handle) = self.revocation.take() {
            handle.revoke();
        }
        self.owner = Some(owner.to_string());
    }

    pub fn opacity(&self, layer: FadeLayer) -> f64 {
        self.opacity[layer.index()]
    }

    pub fn clear_enabled(&self, layer: FadeLayer) -> bool {
        self.clear_enabled[layer.index()]
    }

    pub fn has_image(&self, layer: FadeLayer) -> bool {
        self.images[layer.index()]
    }
}

impl CrossFade for RecordingCrossFade {
    fn acquire_control(&mut self, owner: &str) -> LayerLease {
        if let Some(previous) = self.revocation.take() {
            previous.revoke();
        }
        let lease = LayerLease::new(owner, self.next_lease);
        self.next_lease += 1;
        self.revocation = Some(lease.revocation_handle());
        self.owner = Some(owner.to_string());
        lease
    }

    fn release_control(&mut self, lease: LayerLease) {
        if !lease.is_revoked() && self.owner.as_deref() == Some(lease.owner()) {
            self.owner = None;
            self.revocation = None;
        }
    }

    fn render_fading_image(&mut self, layer: FadeLayer, budget: Option<Duration>) -> bool {
        self.snapshot_renders += 1;
        self.last_budget = budget;
        self.images[layer.index()] = true;
        self.render_completes
    }

    fn release_fading_image(&mut self, layer: FadeLayer) {
        self.images[layer.index()] = false;
    }

    fn set_model_target_layer(&mut self, layer: Option<FadeLayer>) {
        self.target = layer;
    }

    fn set_cross_fade_opacity(&mut self, layer: FadeLayer, opacity: f64) {
        self.opacity[layer.index()] = opacity;
    }

    fn set_clear_enabled(&mut self, layer: FadeLayer, enabled: bool) {
        self.clear_enabled[layer.index()] = enabled;
    }

    fn set_sao_heuristic_enabled(&mut self, enabled: bool) {
        self.sao_heuristic = enabled;
    }
}

/// Recording viewer.
#[derive(Debug)]
pub struct RecordingViewer {
    /// Active cut plane sets by name.
    pub cut_plane_sets: FxHashMap<String, CutPlanes>,
    pub cut_plane_updates: usize,
    pub ao: AoOptions,
    pub spatial_filter_supported: bool,
    pub spatial_filter: Option<SpatialFilter>,
    pub rollover_highlight: bool,
    pub highlight_intensity: f64,
    pub invalidations: usize,
    pub cross_fade: Option<RecordingCrossFade>,
    pub models: Vec<RecordedModel>,
}

impl Default for RecordingViewer {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingViewer {
    pub fn new() -> Self {
        Self {
            cut_plane_sets: FxHashMap::default(),
            cut_plane_updates: 0,
            ao: AoOptions {
                radius: 10.0,
                intensity: 0.4,
                opacity: 1.0,
            },
            spatial_filter_supported: true,
            spatial_filter: None,
            rollover_highlight: false,
            highlight_intensity: 1.0,
            invalidations: 0,
            cross_fade: Some(RecordingCrossFade::default()),
            models: Vec::new(),
        }
    }

    /// Viewer without the cross-fade effect, i.e. without ghost floors.
    pub fn without_cross_fade(mut self) -> Self {
        self.cross_fade = None;
        self
    }

    pub fn with_model(mut self, model: RecordedModel) -> Self {
        self.add_model(model);
        self
    }

    pub fn add_model(&mut self, model: RecordedModel) {
        self.models.retain(|m| m.id != model.id);
        self.models.push(model);
    }

    pub fn remove_model(&mut self, id: ModelId) -> Option<RecordedModel> {
        let pos = self.models.iter().position(|m| m.id == id)?;
        Some(self.models.remove(pos))
    }

    pub fn model(&self, id: ModelId) -> Option<&RecordedModel> {
        self.models.iter().find(|m| m.id == id)
    }

    pub fn model_mut(&mut self, id: ModelId) -> Option<&mut RecordedModel> {
        self.models.iter_mut().find(|m| m.id == id)
    }

    pub fn fade(&self) -> Option<&RecordingCrossFade> {
        self.cross_fade.as_ref()
    }

    pub fn fade_mut(&mut self) -> Option<&mut RecordingCrossFade> {
        self.cross_fade.as_mut()
    }

    /// The elevation range a named plane set currently keeps.
    pub fn applied_section(&self, name: &str) -> Option<ZRange> {
        let planes = self.cut_plane_sets.get(name)?;
        let lower = planes.first()?;
        let upper = planes.get(1)?;
        Some(ZRange::new(lower.w, -upper.w))
    }

    pub fn is_hidden(&self, model: ModelId, db_id: DbId) -> bool {
        self.model(model)
            .and_then(|m| m.visibility.as_ref())
            .map_or(false, |v| v.hidden.contains(&db_id))
    }

    pub fn node_box_queries(&self, model: ModelId) -> usize {
        self.model(model)
            .and_then(|m| m.tree.as_ref())
            .map_or(0, RecordedTree::queries)
    }
}

impl Renderer for RecordingViewer {
    fn set_cut_plane_set(&mut self, name: &str, planes: Option<CutPlanes>) {
        self.cut_plane_updates += 1;
        match planes {
            Some(planes) => {
                self.cut_plane_sets.insert(name.to_string(), planes);
            }
            None => {
                self.cut_plane_sets.remove(name);
            }
        }
    }

    fn ao_options(&self) -> AoOptions {
        self.ao
    }

    fn set_ao_options(&mut self, options: AoOptions) {
        self.ao = options;
    }

    fn spatial_filter_for_rollover_supported(&self) -> bool {
        self.spatial_filter_supported
    }

    fn set_spatial_filter_for_rollover(&mut self, filter: Option<SpatialFilter>) {
        self.spatial_filter = filter;
    }

    fn set_rollover_highlight(&mut self, enabled: bool) {
        // Highlighting fades back in whenever it is switched on.
        if enabled {
            self.highlight_intensity = 1.0;
        }
        self.rollover_highlight = enabled;
    }

    fn highlight_intensity(&self) -> f64 {
        self.highlight_intensity
    }

    fn set_highlight_intensity(&mut self, intensity: f64) {
        self.highlight_intensity = intensity;
    }

    fn invalidate(&mut self) {
        self.invalidations += 1;
    }
}

impl ModelScene for RecordingViewer {
    fn visible_models(&self) -> Vec<ModelId> {
        self.models.iter().filter(|m| m.visible).map(|m| m.id).collect()
    }

    fn model_bounds(&self, model: ModelId) -> Option<WorldBox> {
        self.model(model).map(|m| m.bounds)
    }

    fn instance_tree(&self, model: ModelId) -> Option<&dyn InstanceTree> {
        self.model(model)
            .and_then(|m| m.tree.as_ref())
            .map(|tree| tree as &dyn InstanceTree)
    }

    fn visibility_control(&mut self, model: ModelId) -> Option<&mut dyn VisibilityControl> {
        self.model_mut(model)
            .and_then(|m| m.visibility.as_mut())
            .map(|v| v as &mut dyn VisibilityControl)
    }

    fn is_3d(&self, model: ModelId) -> bool {
        self.model(model).map_or(false, |m| m.is_3d)
    }

    fn placement_transform(&self, model: ModelId) -> Option<SpaceTransform<ProjectSpace, WorldSpace>> {
        self.model(model).and_then(|m| m.placement.clone())
    }

    fn model_transform(&self, model: ModelId) -> Option<SpaceTransform<WorldSpace, WorldSpace>> {
        self.model(model).and_then(|m| m.transform.clone())
    }
}

impl Viewer for RecordingViewer {
    fn cross_fade(&mut self) -> Option<&mut dyn CrossFade> {
        self.cross_fade.as_mut().map(|f| f as &mut dyn CrossFade)
    }
}
