// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Cut plane application, model z limits and rollover restriction.

use floorview_core::ZRange;
use nalgebra::Vector4;
use smallvec::smallvec;

use super::{FloorSelector, RollOver, CUT_PLANE_SET_NAME, MAX_Z_LIMIT, MIN_Z_LIMIT};
use crate::viewer::{CutPlanes, SpatialFilter, Viewer};

/// Planes keeping `[z_min, z_max]`. Always two planes, so the renderer never
/// has to rebuild its shaders for a changed plane count.
pub(crate) fn section_planes(z_min: f64, z_max: f64) -> CutPlanes {
    smallvec![
        Vector4::new(0.0, 0.0, -1.0, z_min),
        Vector4::new(0.0, 0.0, 1.0, -z_max),
    ]
}

impl<V: Viewer> FloorSelector<V> {
    /// Restricts rollover highlighting to a floor, to all floors, or turns
    /// it off.
    ///
    /// Stays off if the renderer cannot restrict highlighting spatially, or
    /// if a single floor is visible without ghost floors around it.
    pub fn roll_over_floor(&mut self, target: RollOver) {
        let enabled = self.ghost_floors_enabled() || self.current_floor.is_none();
        let supported = self.viewer.spatial_filter_for_rollover_supported();

        if target == RollOver::None || !supported || !enabled {
            self.set_spatial_filter_for_rollover(RollOver::None);
            self.viewer.set_rollover_highlight(false);
            return;
        }

        self.viewer.set_rollover_highlight(true);
        self.set_spatial_filter_for_rollover(target);
        self.viewer.invalidate();
    }

    pub fn is_rollover_active(&self) -> bool {
        self.rollover_active
    }

    pub(super) fn set_spatial_filter_for_rollover(&mut self, target: RollOver) {
        let filter = match target {
            RollOver::Floor(index) => self
                .floors
                .get(index)
                .map(|floor| SpatialFilter::new(floor.z_min, floor.z_max)),
            RollOver::AllFloors => Some(SpatialFilter::new(self.z_limits.min, self.z_limits.max)),
            RollOver::None => None,
        };
        let restricted = filter.is_some();

        self.viewer.set_spatial_filter_for_rollover(filter);

        // The restriction test needs the ghost floors in the depth target.
        self.with_fade(|fade| fade.set_sao_heuristic_enabled(!restricted));

        self.rollover_active = restricted;
    }

    /// Recomputes the z range covered by all visible models.
    pub(super) fn update_z_limits(&mut self) {
        let mut limits = ZRange::new(MAX_Z_LIMIT, MIN_Z_LIMIT);
        for model in self.viewer.visible_models() {
            if let Some(bounds) = self.viewer.model_bounds(model) {
                limits.min = limits.min.min(bounds.min.z);
                limits.max = limits.max.max(bounds.max.z);
            }
        }

        if limits.min > limits.max {
            limits = ZRange::new(MIN_Z_LIMIT, MAX_Z_LIMIT);
        }
        self.z_limits = limits;
    }

    /// Applies `[min, max]` to the cut planes. Unset or non-finite bounds
    /// fall back to the sentinels.
    pub(super) fn apply_floor_section(&mut self, min: Option<f64>, max: Option<f64>) {
        if !self.enabled {
            self.viewer.set_cut_plane_set(CUT_PLANE_SET_NAME, None);
            return;
        }

        let min = min.filter(|z| z.is_finite()).unwrap_or(MIN_Z_LIMIT);
        let max = max.filter(|z| z.is_finite()).unwrap_or(MAX_Z_LIMIT);
        self.viewer
            .set_cut_plane_set(CUT_PLANE_SET_NAME, Some(section_planes(min, max)));
    }

    pub(super) fn apply_selected_floor_section(&mut self) {
        self.apply_floor_section(self.floor_section_min, self.floor_section_max);
    }

    pub(super) fn set_floor_section(&mut self, min: Option<f64>, max: Option<f64>) {
        self.floor_section_min = min.filter(|z| !z.is_nan());
        self.floor_section_max = max.filter(|z| !z.is_nan());
        self.apply_selected_floor_section();
    }

    /// Opens the cut planes to the full range, keeping the selected section
    /// stored. Used to render the ghost floors.
    pub(super) fn clear_floor_section(&mut self) {
        self.update_z_limits();
        self.apply_floor_section(None, None);
    }
}
