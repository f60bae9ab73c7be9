// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Render mode transitions, ghost floor fading and AO ownership.

use std::time::Duration;

use floorview_core::{Floor, ZRange};

use super::{
    AoState, FadeCompletion, FloorSelector, FloorTransition, GhostFade, RenderMode, RollOver,
    CROSS_FADE_OWNER,
};
use crate::anim::{lerp, smoother_step, ValueAnimation};
use crate::viewer::{CrossFade, FadeLayer, Viewer};

impl<V: Viewer> FloorSelector<V> {
    /// Fades in the ghost floors. Called when the pointer enters the level
    /// panel.
    ///
    /// During a transition only the intent is latched; the mode switches
    /// once the transition has finished.
    pub fn enter_hover_mode(&mut self) {
        if self.mode != RenderMode::Transition {
            self.set_mode(RenderMode::Hovering);
        }
        self.hovering = true;
    }

    /// Fades out the ghost floors. Called when the pointer leaves the level
    /// panel. `force` leaves hover mode even during a transition.
    pub fn exit_hover_mode(&mut self, force: bool) {
        if self.mode != RenderMode::Transition || force {
            self.set_mode(RenderMode::Off);
        }
        self.hovering = false;

        // No leftover rollover restriction for subsequent object picking.
        self.set_spatial_filter_for_rollover(RollOver::None);
    }

    pub fn set_panel_hover_effect_enabled(&mut self, enabled: bool) {
        self.exit_hover_mode(true);
        self.skip_fade_animations();
        self.fade_enabled = enabled;
    }

    /// Re-renders the ghost floor images, e.g. after the render targets
    /// were resized.
    pub fn force_image_refresh(&mut self) {
        let was_hovering = self.hovering;

        self.exit_hover_mode(false);
        self.skip_fade_animations();

        if was_hovering {
            self.enter_hover_mode();
            self.skip_fade_animations();
        }
    }

    /// Runs `f` against the cross-fade layers if ghost floors are in use.
    ///
    /// Once the layers were taken over by another consumer nothing is
    /// written to them until hover mode acquires them again.
    pub(super) fn with_fade<R>(&mut self, f: impl FnOnce(&mut dyn CrossFade) -> R) -> Option<R> {
        self.check_preemption();
        if !self.fade_enabled || self.preempted {
            return None;
        }
        self.viewer.cross_fade().map(f)
    }

    pub(super) fn ghost_floors_enabled(&mut self) -> bool {
        self.fade_enabled && self.viewer.cross_fade().is_some()
    }

    pub(super) fn set_mode(&mut self, mode: RenderMode) {
        if mode == self.mode {
            return;
        }
        tracing::debug!(from = ?self.mode, to = ?mode, "render mode");
        self.mode = mode;

        match mode {
            RenderMode::Hovering => self.enter_hovering(),
            RenderMode::Transition => self.enter_transition(),
            RenderMode::Off => self.enter_off(),
        }
    }

    fn enter_hovering(&mut self) {
        if !self.ghost_floors_enabled() {
            return;
        }

        if !self.holds_cross_fade() {
            self.lease = self
                .viewer
                .cross_fade()
                .map(|fade| fade.acquire_control(CROSS_FADE_OWNER));
            self.preempted = false;
        }

        // Snapshot of the selected floors into layer 0.
        self.with_fade(|fade| fade.set_model_target_layer(None));
        self.apply_selected_floor_section();
        self.viewer.set_rollover_highlight(false);
        self.set_ao_visible(true);

        let budget = self.config.offscreen_render_budget();
        let complete = self.with_fade(|fade| {
            let complete = fade.render_fading_image(FadeLayer::Snapshot, budget);
            fade.set_cross_fade_opacity(FadeLayer::Snapshot, 1.0);
            complete
        });
        if complete == Some(false) {
            tracing::debug!(budget = ?budget, "floor snapshot incomplete within render budget");
        }

        // Everything else renders live into layer 1.
        self.clear_floor_section();
        self.with_fade(|fade| fade.set_model_target_layer(Some(FadeLayer::Ghost)));

        // Hide AO before the fade starts, otherwise the ghost floors' AO
        // would pop in.
        self.set_ao_visible(false);

        self.stop_fade_anim();
        let target = self.config.max_ghost_opacity.clamp(0.0, 1.0);
        self.fade_anim = Some(GhostFade {
            anim: ValueAnimation::new(self.ghost_opacity, target, self.config.fading_time()),
            on_finish: FadeCompletion::Nothing,
        });
    }

    fn enter_transition(&mut self) {
        self.with_fade(|fade| {
            // Keep the ghost floors drawn so far.
            fade.set_clear_enabled(FadeLayer::Ghost, false);

            fade.set_clear_enabled(FadeLayer::Snapshot, true);
            fade.set_model_target_layer(Some(FadeLayer::Snapshot));
            fade.set_cross_fade_opacity(FadeLayer::Snapshot, 1.0);
        });

        self.set_ao_visible(true);
        self.apply_selected_floor_section();
    }

    fn enter_off(&mut self) {
        self.stop_fade_anim();
        self.fade_anim = Some(GhostFade {
            anim: ValueAnimation::new(self.ghost_opacity, 0.0, self.config.fading_time()),
            on_finish: FadeCompletion::LeaveHoverMode,
        });
    }

    /// Restores default rendering once the ghost floors have faded out.
    pub(super) fn leave_hover_mode(&mut self) {
        if !self.ghost_floors_enabled() {
            self.release_lease();
            return;
        }

        self.with_fade(|fade| {
            fade.release_fading_image(FadeLayer::Snapshot);
            fade.release_fading_image(FadeLayer::Ghost);
            fade.set_model_target_layer(None);
            fade.set_clear_enabled(FadeLayer::Ghost, true);
        });
        self.release_lease();

        self.apply_selected_floor_section();
        self.set_ao_visible(true);
    }

    pub(super) fn release_lease(&mut self) {
        let Some(lease) = self.lease.take() else {
            return;
        };
        if lease.is_revoked() {
            return;
        }
        if let Some(fade) = self.viewer.cross_fade() {
            fade.release_control(lease);
        }
    }

    /// Skips the fade-out of ghost floors that just left hover mode.
    pub(super) fn interrupt_fading(&mut self) {
        let fading = self
            .fade_anim
            .as_ref()
            .map_or(false, |fade| fade.anim.is_running());
        if self.hovering || !fading {
            return;
        }

        self.stop_fade_anim();
        self.set_ghost_opacity(0.0);
        self.leave_hover_mode();
    }

    pub(super) fn check_preemption(&mut self) {
        if self.lease.as_ref().map_or(false, |lease| lease.is_revoked()) {
            self.handle_preemption();
        }
    }

    /// The layers belong to someone else now: drop the ghost floors without
    /// touching the layers again.
    pub(super) fn handle_preemption(&mut self) {
        tracing::debug!("cross-fade layers preempted, dropping ghost floors");

        self.lease = None;
        self.preempted = true;
        if let Some(mut fade) = self.fade_anim.take() {
            fade.anim.stop();
        }
        self.ghost_opacity = 0.0;

        self.apply_selected_floor_section();
        self.set_ao_visible(true);

        if self.mode == RenderMode::Hovering {
            self.mode = RenderMode::Off;
        }
    }

    /// Starts the cut plane animation towards `floor`.
    pub(super) fn move_to_floor(&mut self, floor: Option<usize>) {
        self.check_preemption();
        self.current_floor = floor;
        self.set_mode(RenderMode::Transition);

        let target = self.floor(floor).map(Floor::band);
        self.update_z_limits();

        let from = ZRange::new(
            self.floor_section_min.unwrap_or(self.z_limits.min),
            self.floor_section_max.unwrap_or(self.z_limits.max),
        );
        let to = target.unwrap_or(self.z_limits);

        self.stop_floor_anim();
        self.floor_anim = Some(FloorTransition {
            anim: ValueAnimation::new(0.0, 1.0, self.config.fading_time()),
            from,
            to,
        });
    }

    pub(super) fn advance_fade(&mut self, dt: Duration) {
        let Some(mut fade) = self.fade_anim.take() else {
            return;
        };

        let step = fade.anim.advance(dt);
        self.set_ghost_opacity(step.value);

        if step.finished {
            self.finish_fade(fade.on_finish);
        } else {
            self.fade_anim = Some(fade);
        }
    }

    pub(super) fn advance_transition(&mut self, dt: Duration) {
        let Some(mut transition) = self.floor_anim.take() else {
            return;
        };

        let step = transition.anim.advance(dt);
        self.apply_transition_step(&transition, step.unit_time);

        if step.finished {
            self.finish_transition();
        } else {
            self.floor_anim = Some(transition);
        }
    }

    fn apply_transition_step(&mut self, transition: &FloorTransition, unit_time: f64) {
        let t = smoother_step(unit_time);
        let min = lerp(transition.from.min, transition.to.min, t);
        let max = lerp(transition.from.max, transition.to.max, t);
        self.set_floor_section(Some(min), Some(max));

        // Fade out rollover highlighting while moving.
        let intensity = self.viewer.highlight_intensity();
        self.viewer.set_highlight_intensity(intensity.min(1.0 - t));
    }

    fn finish_fade(&mut self, completion: FadeCompletion) {
        match completion {
            FadeCompletion::Nothing => {}
            FadeCompletion::LeaveHoverMode => self.leave_hover_mode(),
        }
    }

    /// Returns to hover mode only while the layers are still ours.
    pub(super) fn finish_transition(&mut self) {
        let mode = if self.hovering && !self.preempted {
            RenderMode::Hovering
        } else {
            RenderMode::Off
        };
        self.set_mode(mode);
    }

    pub(super) fn stop_floor_anim(&mut self) {
        if let Some(mut transition) = self.floor_anim.take() {
            transition.anim.stop();
        }
    }

    pub(super) fn stop_fade_anim(&mut self) {
        if let Some(mut fade) = self.fade_anim.take() {
            fade.anim.stop();
        }
    }

    /// Jumps both animations to their end state, running their completions.
    pub(super) fn skip_fade_animations(&mut self) {
        if let Some(mut fade) = self.fade_anim.take() {
            let step = fade.anim.skip();
            self.set_ghost_opacity(step.value);
            self.finish_fade(fade.on_finish);
        }

        if let Some(mut transition) = self.floor_anim.take() {
            let step = transition.anim.skip();
            self.apply_transition_step(&transition, step.unit_time);
            self.finish_transition();
        }
    }

    fn set_ghost_opacity(&mut self, opacity: f64) {
        self.with_fade(|fade| fade.set_cross_fade_opacity(FadeLayer::Ghost, opacity));
        self.ghost_opacity = opacity;
    }

    /// Hides AO by zeroing its opacity, or restores the backed up opacity.
    pub(super) fn set_ao_visible(&mut self, visible: bool) {
        let mut options = self.viewer.ao_options();

        match (self.ao, visible) {
            (AoState::Visible, false) => {
                self.ao = AoState::Hidden {
                    backup: options.opacity,
                };
                options.opacity = 0.0;
            }
            (AoState::Hidden { backup }, true) => {
                if options.opacity != 0.0 {
                    tracing::warn!(
                        opacity = options.opacity,
                        backup,
                        "AO opacity changed while hidden by the floor selector"
                    );
                }
                self.ao = AoState::Visible;
                options.opacity = backup;
            }
            _ => return,
        }

        self.viewer.set_ao_options(options);
    }
}
