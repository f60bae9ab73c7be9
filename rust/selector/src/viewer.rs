// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Collaborator interfaces of the floor selector.
//!
//! The selector drives a 3D viewer through these traits only:
//!
//! - [`Renderer`]: cut planes, ambient occlusion, rollover highlighting
//! - [`CrossFade`]: the two auxiliary color layers used for ghost floors,
//!   guarded by a revocable [`LayerLease`]
//! - [`ModelScene`]: loaded models, their bounds, instance trees and
//!   visibility control
//!
//! A [`Viewer`] bundles all three. Everything is expressed in world
//! coordinates.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use floorview_core::{DbId, ModelId, ProjectSpace, SpaceTransform, WorldBox, WorldSpace};
use nalgebra::{Point3, Vector4};
use smallvec::SmallVec;

/// Plane `(a, b, c, d)`; geometry with `a*x + b*y + c*z + d > 0` is cut.
pub type CutPlane = Vector4<f64>;

/// A named cut plane set. The floor selector always uses exactly two planes.
pub type CutPlanes = SmallVec<[CutPlane; 2]>;

/// Ambient occlusion parameters as exposed by the renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AoOptions {
    pub radius: f64,
    pub intensity: f64,
    pub opacity: f64,
}

/// Restricts an effect to world positions within an elevation band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialFilter {
    pub z_min: f64,
    pub z_max: f64,
}

impl SpatialFilter {
    pub fn new(z_min: f64, z_max: f64) -> Self {
        Self { z_min, z_max }
    }

    #[inline]
    pub fn contains(&self, world_pos: &Point3<f64>) -> bool {
        world_pos.z >= self.z_min && world_pos.z <= self.z_max
    }

    /// The predicate as a GLSL function for fragment-level evaluation.
    pub fn to_shader_source(&self) -> String {
        format!(
            "bool spatialFilter(vec3 worldPos) {{ return (worldPos.z >= float({:?}) && worldPos.z <= float({:?})); }}",
            self.z_min, self.z_max
        )
    }
}

/// The two auxiliary color layers of the cross-fade effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FadeLayer {
    /// Layer 0: frozen snapshot of the selected floor.
    Snapshot,
    /// Layer 1: live rendering of all floors (the ghost floors).
    Ghost,
}

impl FadeLayer {
    #[inline]
    pub fn index(self) -> usize {
        match self {
            FadeLayer::Snapshot => 0,
            FadeLayer::Ghost => 1,
        }
    }
}

/// Exclusive, revocable ownership of the cross-fade layers.
///
/// The provider keeps the [`RevocationHandle`] and fires it when another
/// consumer takes the layers over. The holder checks [`LayerLease::is_revoked`]
/// before touching the layers again.
#[derive(Debug)]
pub struct LayerLease {
    owner: String,
    id: u64,
    revoked: Rc<Cell<bool>>,
}

impl LayerLease {
    pub fn new(owner: impl Into<String>, id: u64) -> Self {
        Self {
            owner: owner.into(),
            id,
            revoked: Rc::new(Cell::new(false)),
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_revoked(&self) -> bool {
        self.revoked.get()
    }

    pub fn revocation_handle(&self) -> RevocationHandle {
        RevocationHandle(Rc::clone(&self.revoked))
    }
}

/// Provider-side handle used to preempt a [`LayerLease`].
#[derive(Debug, Clone)]
pub struct RevocationHandle(Rc<Cell<bool>>);

impl RevocationHandle {
    pub fn revoke(&self) {
        self.0.set(true);
    }
}

/// Cut planes, ambient occlusion and hover highlighting.
pub trait Renderer {
    /// Replaces the named plane set; `None` removes it.
    fn set_cut_plane_set(&mut self, name: &str, planes: Option<CutPlanes>);

    fn ao_options(&self) -> AoOptions;
    fn set_ao_options(&mut self, options: AoOptions);

    /// Whether rollover highlighting can be restricted by a [`SpatialFilter`].
    fn spatial_filter_for_rollover_supported(&self) -> bool;
    fn set_spatial_filter_for_rollover(&mut self, filter: Option<SpatialFilter>);

    /// Enables highlight-on-hover for all objects.
    fn set_rollover_highlight(&mut self, enabled: bool);
    fn highlight_intensity(&self) -> f64;
    fn set_highlight_intensity(&mut self, intensity: f64);

    /// Requests a redraw.
    fn invalidate(&mut self);
}

/// Two extra color layers that can be rendered into and blended by opacity.
pub trait CrossFade {
    fn acquire_control(&mut self, owner: &str) -> LayerLease;
    fn release_control(&mut self, lease: LayerLease);

    /// Renders a frozen snapshot of the current scene into `layer`. Returns
    /// true once the image is complete, false if the budget ran out first.
    fn render_fading_image(&mut self, layer: FadeLayer, budget: Option<Duration>) -> bool;
    fn release_fading_image(&mut self, layer: FadeLayer);

    /// Routes model rendering into `layer`; `None` renders to the default
    /// target.
    fn set_model_target_layer(&mut self, layer: Option<FadeLayer>);
    fn set_cross_fade_opacity(&mut self, layer: FadeLayer, opacity: f64);
    fn set_clear_enabled(&mut self, layer: FadeLayer, enabled: bool);

    /// When enabled, faint layers skip the depth/id pass.
    fn set_sao_heuristic_enabled(&mut self, enabled: bool);
}

/// Per-object bounds of a model.
pub trait InstanceTree {
    fn node_box(&self, db_id: DbId) -> Option<WorldBox>;
}

/// Per-object visibility of a model.
pub trait VisibilityControl {
    fn set_node_off(&mut self, db_id: DbId, off: bool);
}

/// Loaded models and their object-level services.
pub trait ModelScene {
    /// Models currently shown in the viewer.
    fn visible_models(&self) -> Vec<ModelId>;

    fn model_bounds(&self, model: ModelId) -> Option<WorldBox>;

    /// `None` until the model's object tree has been loaded.
    fn instance_tree(&self, model: ModelId) -> Option<&dyn InstanceTree>;

    /// `None` while the model's visibility control is not available, e.g.
    /// before it has been initialized or after the model was unloaded.
    fn visibility_control(&mut self, model: ModelId) -> Option<&mut dyn VisibilityControl>;

    fn is_object_tree_loaded(&self, model: ModelId) -> bool {
        self.instance_tree(model).is_some()
    }

    fn is_3d(&self, _model: ModelId) -> bool {
        true
    }

    /// Transform from the model's project coordinates into the viewer.
    fn placement_transform(&self, _model: ModelId) -> Option<SpaceTransform<ProjectSpace, WorldSpace>> {
        None
    }

    /// Additional transform applied to the whole model in the viewer.
    fn model_transform(&self, _model: ModelId) -> Option<SpaceTransform<WorldSpace, WorldSpace>> {
        None
    }
}

/// Everything the floor selector talks to.
pub trait Viewer: Renderer + ModelScene {
    /// `None` if the cross-fade effect is unavailable.
    fn cross_fade(&mut self) -> Option<&mut dyn CrossFade>;
}
