// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Floor Selector - floor isolation with animated cut planes and ghost floors
//!
//! The selector keeps a list of [`Floor`]s and shows either all of them or a
//! single selected one, by applying two horizontal cut planes. On top of that
//! it provides:
//!
//! - animated transitions of the cut planes when the selection changes
//! - ghost floors: while the user hovers the level panel, all other floors
//!   fade in at low opacity through the cross-fade layers
//! - rollover highlighting restricted to a single floor
//! - object filtering of adjacent floor and ceiling slabs ([`FloorFilter`])
//!
//! # Render modes
//!
//! ```text
//!            enter_hover_mode               select_floor(_, true)
//!   Off ---------------------> Hovering ---------------------> Transition
//!    ^  <---------------------    ^                                 |
//!    |     exit_hover_mode        |  animation done, hovering       |
//!    |                            +---------------------------------+
//!    +--------------------------------------------------------------+
//!                         animation done, not hovering
//! ```
//!
//! The selector is driven by [`FloorSelector::tick`], which the host calls
//! once per rendered frame. Nothing blocks; all waiting is expressed as
//! animations advanced by ticks.

mod modes;
mod section;

#[cfg(test)]
mod tests;

use std::time::Duration;

use floorview_core::{normalize_floors, DbId, Floor, ModelId, ZRange};

use crate::anim::ValueAnimation;
use crate::config::SelectorConfig;
use crate::error::Result;
use crate::events::{EventBus, ListenerKey, SelectorEvent};
use crate::filter::{FloorFilter, FloorFilterData};
use crate::viewer::{LayerLease, Viewer};

/// Stand-in for an unbounded cut plane elevation. Cut planes end up in
/// shader uniforms, so infinity is not an option.
pub const MAX_Z_LIMIT: f64 = 1e20;
pub const MIN_Z_LIMIT: f64 = -MAX_Z_LIMIT;

/// Name of the cut plane set owned by the selector, independent of other
/// sectioning tools.
pub const CUT_PLANE_SET_NAME: &str = "floorview.FloorSelector";

/// Owner name used when acquiring the cross-fade layers.
pub const CROSS_FADE_OWNER: &str = "floorview.FloorSelector";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Only the selected floor range is rendered.
    Off,
    /// Selected floors from a frozen snapshot, the other floors live and
    /// faded.
    Hovering,
    /// Cut planes are moving towards a newly selected floor.
    Transition,
}

/// Target of rollover highlighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollOver {
    /// Highlight objects of one floor.
    Floor(usize),
    /// Highlight objects within the z range of all visible models.
    AllFloors,
    /// No rollover highlighting.
    None,
}

/// Ambient occlusion ownership. Ghost floors are rendered without AO since
/// AO cannot be cross-faded.
#[derive(Debug, Clone, Copy, PartialEq)]
enum AoState {
    Visible,
    /// AO opacity is forced to zero; `backup` is restored on release.
    Hidden { backup: f64 },
}

#[derive(Debug, Clone, Copy)]
struct FloorTransition {
    anim: ValueAnimation,
    from: ZRange,
    to: ZRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FadeCompletion {
    Nothing,
    LeaveHoverMode,
}

#[derive(Debug, Clone, Copy)]
struct GhostFade {
    anim: ValueAnimation,
    on_finish: FadeCompletion,
}

/// Floor selection state machine on top of a [`Viewer`].
pub struct FloorSelector<V: Viewer> {
    viewer: V,
    config: SelectorConfig,

    floors: Vec<Floor>,

    mode: RenderMode,
    /// Latched panel-hover intent, survives transitions.
    hovering: bool,

    /// Applied cut plane range. Lags `current_floor` while a transition runs.
    floor_section_min: Option<f64>,
    floor_section_max: Option<f64>,

    /// z range of all visible models, for "all floors" targets.
    z_limits: ZRange,

    floor_anim: Option<FloorTransition>,
    fade_anim: Option<GhostFade>,

    /// Opacity of the ghost floor layer. Zero while not ghosting.
    ghost_opacity: f64,

    current_floor: Option<usize>,

    ao: AoState,

    filter: FloorFilter,
    filter_data: Option<FloorFilterData>,

    rollover_active: bool,
    fade_enabled: bool,
    enabled: bool,

    lease: Option<LayerLease>,
    /// Set when another consumer took the cross-fade layers from us.
    preempted: bool,

    events: EventBus<SelectorEvent>,
}

impl<V: Viewer> FloorSelector<V> {
    pub fn new(viewer: V, config: SelectorConfig) -> Self {
        Self {
            viewer,
            config,
            floors: Vec::new(),
            mode: RenderMode::Off,
            hovering: false,
            floor_section_min: None,
            floor_section_max: None,
            z_limits: ZRange::new(MIN_Z_LIMIT, MAX_Z_LIMIT),
            floor_anim: None,
            fade_anim: None,
            ghost_opacity: 0.0,
            current_floor: None,
            ao: AoState::Visible,
            filter: FloorFilter::new(),
            filter_data: None,
            rollover_active: false,
            fade_enabled: true,
            enabled: true,
            lease: None,
            preempted: false,
            events: EventBus::new(),
        }
    }

    pub fn viewer(&self) -> &V {
        &self.viewer
    }

    pub fn viewer_mut(&mut self) -> &mut V {
        &mut self.viewer
    }

    pub fn config(&self) -> &SelectorConfig {
        &self.config
    }

    // ---------------------------------------------------------------------
    // Floor data
    // ---------------------------------------------------------------------

    pub fn floor_data(&self) -> &[Floor] {
        &self.floors
    }

    /// Replaces the floor list and resets selection and filter state.
    ///
    /// Floors must be ordered ascending by elevation with finite bands
    /// `z_min < z_max`; they are renumbered by position. On error nothing
    /// changes.
    pub fn set_floor_data(&mut self, floors: Vec<Floor>) -> Result<()> {
        let floors = normalize_floors(floors)?;

        self.reset_state();
        self.floors = floors;
        tracing::debug!(floors = self.floors.len(), "floor data changed");

        self.events.emit(&SelectorEvent::FloorDataChanged {
            floors: self.floors.clone(),
        });
        Ok(())
    }

    /// Drops floors, selection, cut planes and filter state.
    pub fn reset_state(&mut self) {
        self.floors.clear();
        self.select_floor_section(None);
        self.clear_floor_section();
        self.filter.clear_filter(&mut self.viewer);
        self.filter.reset_cache();
    }

    pub fn floor_filter_data(&self) -> Option<&FloorFilterData> {
        self.filter_data.as_ref()
    }

    /// Sets the candidate objects for floor filtering. Takes effect with the
    /// next selection.
    pub fn set_floor_filter_data(&mut self, data: Option<FloorFilterData>) -> Result<()> {
        if let Some(data) = &data {
            data.validate()?;
        }
        self.filter_data = data;
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Selection
    // ---------------------------------------------------------------------

    pub fn current_floor(&self) -> Option<usize> {
        self.current_floor
    }

    /// Whether `floor` can be selected: floor data is present, the floor is
    /// in range and not already selected. `None` stands for all floors.
    pub fn floor_selection_valid(&self, floor: Option<usize>) -> bool {
        !self.floors.is_empty()
            && self.current_floor != floor
            && floor.map_or(true, |index| index < self.floors.len())
    }

    /// Selects a single floor, or all floors for `None`.
    ///
    /// With `use_transition` the cut planes move to the new range in a short
    /// animation. Returns `Ok(false)` if the selection was not valid (see
    /// [`FloorSelector::floor_selection_valid`]), in which case nothing
    /// changes and no event fires.
    pub fn select_floor(&mut self, floor: Option<usize>, use_transition: bool) -> Result<bool> {
        if !self.floor_selection_valid(floor) {
            return Ok(false);
        }

        if use_transition {
            self.move_to_floor(floor);
        } else {
            self.select_floor_section(floor);
        }

        self.run_floor_filter()?;

        // Without ghost floors, rollover is pointless once only a single
        // floor is visible.
        if !self.ghost_floors_enabled() {
            self.roll_over_floor(RollOver::None);
        }

        self.events
            .emit(&SelectorEvent::SelectedFloorChanged { floor });
        Ok(true)
    }

    /// Re-applies `floor` and the object filter, e.g. after models changed.
    /// Out-of-range indices select all floors.
    pub fn invalidate_floor_selection(&mut self, floor: Option<usize>) -> Result<()> {
        let floor = floor.filter(|&index| index < self.floors.len());
        self.select_floor_section(floor);
        self.run_floor_filter()
    }

    /// True unless the object is cut away by the selected floor or hidden by
    /// the floor filter.
    ///
    /// Checks against the selected floor rather than the applied section, so
    /// the result does not depend on animation progress.
    pub fn is_visible(&self, model: ModelId, db_id: DbId) -> bool {
        let Some(floor) = self.current_floor.and_then(|index| self.floors.get(index)) else {
            return true;
        };
        let Some(tree) = self.viewer.instance_tree(model) else {
            return true;
        };

        let outside = tree
            .node_box(db_id)
            .map_or(false, |node| floor.band().excludes(node.min.z, node.max.z));
        !outside && self.filter.is_visible(model, db_id)
    }

    /// A disabled selector keeps its cut plane set cleared, e.g. for 2D
    /// views.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        self.apply_selected_floor_section();
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    // ---------------------------------------------------------------------
    // Observed state
    // ---------------------------------------------------------------------

    pub fn render_mode(&self) -> RenderMode {
        self.mode
    }

    pub fn is_hovering(&self) -> bool {
        self.hovering
    }

    pub fn ghost_opacity(&self) -> f64 {
        self.ghost_opacity
    }

    pub fn is_ao_hidden(&self) -> bool {
        matches!(self.ao, AoState::Hidden { .. })
    }

    pub fn holds_cross_fade(&self) -> bool {
        self.lease.as_ref().map_or(false, |lease| !lease.is_revoked())
    }

    /// Whether a transition or fade animation is in flight.
    pub fn is_animating(&self) -> bool {
        self.floor_anim.is_some() || self.fade_anim.is_some()
    }

    /// The applied cut plane range, with the sentinels standing in for an
    /// unset bound.
    pub fn floor_section(&self) -> ZRange {
        ZRange::new(
            self.floor_section_min.unwrap_or(MIN_Z_LIMIT),
            self.floor_section_max.unwrap_or(MAX_Z_LIMIT),
        )
    }

    pub fn z_limits(&self) -> ZRange {
        self.z_limits
    }

    pub fn floor_filter(&self) -> &FloorFilter {
        &self.filter
    }

    // ---------------------------------------------------------------------
    // Events
    // ---------------------------------------------------------------------

    pub fn subscribe(&mut self, listener: impl FnMut(&SelectorEvent) + 'static) -> ListenerKey {
        self.events.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, key: ListenerKey) -> bool {
        self.events.unsubscribe(key)
    }

    // ---------------------------------------------------------------------
    // Host notifications
    // ---------------------------------------------------------------------

    /// Advances running animations. Call once per rendered frame.
    pub fn tick(&mut self, dt: Duration) {
        self.check_preemption();
        self.advance_fade(dt);
        self.advance_transition(dt);
    }

    /// Ghost floors are a frozen image; camera motion makes them stale.
    pub fn on_camera_changed(&mut self) {
        self.interrupt_fading();
    }

    pub fn on_viewer_resized(&mut self) {
        self.force_image_refresh();
    }

    /// Drops rollover highlighting once the renderer stops supporting it.
    pub fn on_render_options_changed(&mut self) {
        if self.rollover_active && !self.viewer.spatial_filter_for_rollover_supported() {
            self.roll_over_floor(RollOver::None);
        }
    }

    pub fn on_model_added(&mut self, model: ModelId) -> Result<()> {
        self.refresh_filter_for(model)
    }

    pub fn on_object_tree_created(&mut self, model: ModelId) -> Result<()> {
        self.refresh_filter_for(model)
    }

    /// The model's visibility control is gone; forget its hidden objects.
    pub fn on_model_unloaded(&mut self, model: ModelId) {
        if self.filter_data.is_some() && self.current_floor.is_some() {
            self.filter.unhide_model(model);
        }
    }

    /// Another consumer took over the cross-fade layers.
    pub fn on_cross_fade_preempted(&mut self) {
        if self.lease.is_some() {
            self.handle_preemption();
        }
    }

    /// Tears the selector down and hands the viewer back with the selector's
    /// cut planes, hidden objects and layer ownership removed.
    pub fn shutdown(mut self) -> V {
        self.exit_hover_mode(true);
        self.skip_fade_animations();
        self.roll_over_floor(RollOver::None);
        self.filter.clear_filter(&mut self.viewer);
        self.release_lease();
        self.viewer.set_cut_plane_set(CUT_PLANE_SET_NAME, None);
        self.viewer
    }

    // ---------------------------------------------------------------------
    // Internals shared by the submodules
    // ---------------------------------------------------------------------

    fn floor(&self, index: Option<usize>) -> Option<&Floor> {
        index.and_then(|index| self.floors.get(index))
    }

    /// Selects `floor` without animation. Interrupting a transition resolves
    /// it the way its completion would.
    fn select_floor_section(&mut self, floor: Option<usize>) {
        if let Some(mut transition) = self.floor_anim.take() {
            transition.anim.stop();
        }

        self.current_floor = floor;

        let band = self.floor(floor).map(Floor::band);
        self.set_floor_section(band.map(|b| b.min), band.map(|b| b.max));

        if self.mode == RenderMode::Transition {
            self.finish_transition();
        }
    }

    fn run_floor_filter(&mut self) -> Result<()> {
        self.filter.clear_filter(&mut self.viewer);

        let floor = self.current_floor.and_then(|index| self.floors.get(index));
        if let (Some(data), Some(floor)) = (self.filter_data.as_ref(), floor) {
            self.filter.filter(&mut self.viewer, data, floor)?;
        }
        Ok(())
    }

    fn refresh_filter_for(&mut self, model: ModelId) -> Result<()> {
        if !self.viewer.is_object_tree_loaded(model) {
            return Ok(());
        }
        if self.filter_data.is_none() || self.current_floor.is_none() {
            // A level may have been deselected while the model was hidden.
            self.filter.clear_filter(&mut self.viewer);
            return Ok(());
        }
        self.run_floor_filter()
    }
}

impl<V: Viewer + std::fmt::Debug> std::fmt::Debug for FloorSelector<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FloorSelector")
            .field("viewer", &self.viewer)
            .field("floors", &self.floors.len())
            .field("mode", &self.mode)
            .field("hovering", &self.hovering)
            .field("current_floor", &self.current_floor)
            .field("floor_section", &self.floor_section())
            .field("ghost_opacity", &self.ghost_opacity)
            .field("ao", &self.ao)
            .finish_non_exhaustive()
    }
}
