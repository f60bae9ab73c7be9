// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use approx::assert_relative_eq;
use floorview_core::{Floor, ModelId, WorldBox, ZRange};
use rustc_hash::FxHashMap;

use super::{FloorSelector, RenderMode, RollOver, CUT_PLANE_SET_NAME, MAX_Z_LIMIT, MIN_Z_LIMIT};
use crate::config::SelectorConfig;
use crate::events::SelectorEvent;
use crate::filter::FloorFilterData;
use crate::recording::{RecordedModel, RecordingViewer};
use crate::viewer::FadeLayer;

fn floors() -> Vec<Floor> {
    vec![
        Floor::new(0, "g0", "Level 1", 0.0, 3.0),
        Floor::new(1, "g1", "Level 2", 3.0, 6.0),
    ]
}

fn viewer() -> RecordingViewer {
    RecordingViewer::new().with_model(
        RecordedModel::new(ModelId(1), WorldBox::from_z(-1.0, 7.0))
            .with_node(10, WorldBox::from_z(5.0, 5.5))
            .with_node(11, WorldBox::from_z(6.0, 8.0))
            .with_node(12, WorldBox::from_z(6.1, 8.0))
            .with_node(13, WorldBox::from_z(0.0, 3.0)),
    )
}

fn selector_with(viewer: RecordingViewer) -> FloorSelector<RecordingViewer> {
    let mut selector = FloorSelector::new(viewer, SelectorConfig::default());
    selector.set_floor_data(floors()).unwrap();
    selector
}

fn selector() -> FloorSelector<RecordingViewer> {
    selector_with(viewer())
}

fn applied(selector: &FloorSelector<RecordingViewer>) -> ZRange {
    selector
        .viewer()
        .applied_section(CUT_PLANE_SET_NAME)
        .unwrap()
}

fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

#[test]
fn test_select_floor_applies_band() {
    let mut selector = selector();

    assert!(selector.select_floor(Some(1), false).unwrap());
    assert_eq!(applied(&selector), ZRange::new(3.0, 6.0));
    assert_eq!(selector.current_floor(), Some(1));
    assert_eq!(selector.render_mode(), RenderMode::Off);

    assert!(selector.select_floor(None, false).unwrap());
    assert_eq!(applied(&selector), ZRange::new(MIN_Z_LIMIT, MAX_Z_LIMIT));
}

#[test]
fn test_reselect_is_noop() {
    let mut selector = selector();
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    selector.subscribe(move |e| sink.borrow_mut().push(e.clone()));

    assert!(selector.select_floor(Some(0), true).unwrap());
    assert!(!selector.select_floor(Some(0), true).unwrap());

    assert_eq!(
        *events.borrow(),
        vec![SelectorEvent::SelectedFloorChanged { floor: Some(0) }]
    );
}

#[test]
fn test_selection_validity() {
    let mut selector = FloorSelector::new(viewer(), SelectorConfig::default());
    assert!(!selector.floor_selection_valid(Some(0)));
    assert!(!selector.select_floor(None, false).unwrap());

    selector.set_floor_data(floors()).unwrap();
    assert!(selector.floor_selection_valid(Some(1)));
    assert!(!selector.floor_selection_valid(Some(2)));
    // nothing selected yet
    assert!(!selector.floor_selection_valid(None));
}

#[test]
fn test_invalid_floor_data_rejected() {
    let mut selector = selector();
    selector.select_floor(Some(1), false).unwrap();

    let bad = vec![Floor::new(0, "x", "Broken", 3.0, 1.0)];
    assert!(selector.set_floor_data(bad).is_err());
    assert_eq!(selector.floor_data().len(), 2);
    assert_eq!(selector.current_floor(), Some(1));

    let mut descending = floors();
    descending.reverse();
    assert!(selector.set_floor_data(descending).is_err());
    assert_eq!(selector.floor_data()[0].name, "Level 1");
    assert_eq!(selector.current_floor(), Some(1));
}

#[test]
fn test_set_floor_data_resets_and_notifies() {
    let mut selector = selector();
    selector.select_floor(Some(1), false).unwrap();

    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    selector.subscribe(move |e| sink.borrow_mut().push(e.clone()));

    let mut reversed = floors();
    reversed[0].index = 7;
    selector.set_floor_data(reversed).unwrap();

    assert_eq!(selector.current_floor(), None);
    assert_eq!(selector.floor_data()[0].index, 0);
    assert_eq!(applied(&selector), ZRange::new(MIN_Z_LIMIT, MAX_Z_LIMIT));
    assert!(matches!(
        events.borrow().as_slice(),
        [SelectorEvent::FloorDataChanged { floors }] if floors.len() == 2
    ));
}

#[test]
fn test_rollover_suppressed_for_single_floor_without_ghosting() {
    let mut selector = selector_with(viewer().without_cross_fade());

    selector.roll_over_floor(RollOver::Floor(0));
    assert!(selector.viewer().rollover_highlight);
    assert_eq!(
        selector.viewer().spatial_filter.map(|f| (f.z_min, f.z_max)),
        Some((0.0, 3.0))
    );

    selector.select_floor(Some(1), false).unwrap();
    assert_eq!(applied(&selector), ZRange::new(3.0, 6.0));
    assert!(!selector.viewer().rollover_highlight);

    selector.roll_over_floor(RollOver::Floor(0));
    assert!(!selector.viewer().rollover_highlight);
    assert!(selector.viewer().spatial_filter.is_none());
    assert!(!selector.is_rollover_active());
}

#[test]
fn test_rollover_with_ghosting_disables_sao_heuristic() {
    let mut selector = selector();
    selector.select_floor(Some(1), false).unwrap();

    selector.roll_over_floor(RollOver::Floor(0));
    assert!(selector.is_rollover_active());
    assert!(!selector.viewer().fade().unwrap().sao_heuristic);
    assert_eq!(selector.viewer().invalidations, 1);

    selector.roll_over_floor(RollOver::None);
    assert!(!selector.is_rollover_active());
    assert!(selector.viewer().fade().unwrap().sao_heuristic);
}

#[test]
fn test_rollover_all_floors_uses_model_limits() {
    let mut selector = selector();
    selector.enter_hover_mode();
    selector.roll_over_floor(RollOver::AllFloors);

    let filter = selector.viewer().spatial_filter.unwrap();
    assert_relative_eq!(filter.z_min, -1.0);
    assert_relative_eq!(filter.z_max, 7.0);
}

#[test]
fn test_rollover_dropped_when_support_vanishes() {
    let mut selector = selector();
    selector.roll_over_floor(RollOver::Floor(1));
    assert!(selector.is_rollover_active());

    selector.viewer_mut().spatial_filter_supported = false;
    selector.on_render_options_changed();
    assert!(!selector.is_rollover_active());
    assert!(!selector.viewer().rollover_highlight);
}

#[test]
fn test_enter_hover_mode_sets_up_layers() {
    let mut selector = selector();
    selector.select_floor(Some(1), false).unwrap();
    selector.enter_hover_mode();

    assert_eq!(selector.render_mode(), RenderMode::Hovering);
    assert!(selector.holds_cross_fade());
    assert!(selector.is_ao_hidden());
    assert_eq!(selector.viewer().ao.opacity, 0.0);

    let fade = selector.viewer().fade().unwrap();
    assert!(fade.has_image(FadeLayer::Snapshot));
    assert_eq!(fade.opacity(FadeLayer::Snapshot), 1.0);
    assert_eq!(fade.target, Some(FadeLayer::Ghost));

    // live layer shows all floors, the selection stays stored
    assert_eq!(applied(&selector), ZRange::new(MIN_Z_LIMIT, MAX_Z_LIMIT));
    assert_eq!(selector.floor_section(), ZRange::new(3.0, 6.0));

    selector.tick(ms(250));
    assert_relative_eq!(selector.ghost_opacity(), 0.1, epsilon = 1e-9);
    selector.tick(ms(500));
    assert_relative_eq!(selector.ghost_opacity(), 0.2, epsilon = 1e-9);
    assert_relative_eq!(
        selector.viewer().fade().unwrap().opacity(FadeLayer::Ghost),
        0.2,
        epsilon = 1e-9
    );
}

#[test]
fn test_exit_hover_mode_fades_out_and_restores() {
    let mut selector = selector();
    selector.select_floor(Some(1), false).unwrap();
    selector.enter_hover_mode();
    selector.tick(ms(600));

    selector.exit_hover_mode(false);
    assert_eq!(selector.render_mode(), RenderMode::Off);
    assert!(selector.holds_cross_fade());

    selector.tick(ms(600));
    assert_eq!(selector.ghost_opacity(), 0.0);
    assert!(!selector.holds_cross_fade());
    assert!(!selector.is_ao_hidden());
    assert_eq!(selector.viewer().ao.opacity, 1.0);
    assert_eq!(applied(&selector), ZRange::new(3.0, 6.0));

    let fade = selector.viewer().fade().unwrap();
    assert!(fade.owner.is_none());
    assert!(!fade.has_image(FadeLayer::Snapshot));
    assert_eq!(fade.target, None);
    assert!(fade.clear_enabled(FadeLayer::Ghost));
}

#[test]
fn test_hover_then_transition_returns_to_hovering() {
    let mut selector = selector();
    selector.enter_hover_mode();
    selector.select_floor(Some(0), true).unwrap();

    assert_eq!(selector.render_mode(), RenderMode::Transition);
    assert!(selector.is_hovering());
    let fade = selector.viewer().fade().unwrap();
    assert_eq!(fade.target, Some(FadeLayer::Snapshot));
    assert!(!fade.clear_enabled(FadeLayer::Ghost));

    // halfway: smoother step is symmetric, so t = 0.5
    selector.tick(ms(250));
    let section = applied(&selector);
    assert_relative_eq!(section.min, -0.5, epsilon = 1e-9);
    assert_relative_eq!(section.max, 5.0, epsilon = 1e-9);
    assert_relative_eq!(selector.viewer().highlight_intensity, 0.5, epsilon = 1e-9);

    selector.tick(ms(250));
    assert_eq!(selector.render_mode(), RenderMode::Hovering);
    assert_eq!(selector.floor_section(), ZRange::new(0.0, 3.0));
    assert!(selector.holds_cross_fade());
}

#[test]
fn test_exit_during_transition_is_deferred() {
    let mut selector = selector();
    selector.enter_hover_mode();
    selector.select_floor(Some(1), true).unwrap();

    selector.exit_hover_mode(false);
    assert_eq!(selector.render_mode(), RenderMode::Transition);
    assert!(!selector.is_hovering());

    selector.tick(ms(500));
    assert_eq!(selector.render_mode(), RenderMode::Off);

    selector.tick(ms(500));
    assert!(!selector.is_animating());
    assert!(!selector.holds_cross_fade());
    assert_eq!(applied(&selector), ZRange::new(3.0, 6.0));
}

#[test]
fn test_direct_select_resolves_running_transition() {
    let mut selector = selector();
    selector.select_floor(Some(1), true).unwrap();
    assert_eq!(selector.render_mode(), RenderMode::Transition);

    selector.select_floor(Some(0), false).unwrap();
    assert_eq!(selector.render_mode(), RenderMode::Off);
    assert_eq!(applied(&selector), ZRange::new(0.0, 3.0));

    selector.tick(ms(1000));
    assert_eq!(applied(&selector), ZRange::new(0.0, 3.0));
}

#[test]
fn test_camera_change_during_fade_out_cleans_up_synchronously() {
    let mut selector = selector();
    selector.select_floor(Some(1), false).unwrap();
    selector.enter_hover_mode();
    selector.tick(ms(600));

    selector.exit_hover_mode(false);
    selector.tick(ms(100));
    assert_relative_eq!(selector.ghost_opacity(), 0.16, epsilon = 1e-9);

    selector.on_camera_changed();

    assert!(!selector.is_animating());
    assert_eq!(selector.ghost_opacity(), 0.0);
    assert!(!selector.holds_cross_fade());
    assert_eq!(selector.viewer().ao.opacity, 1.0);
    assert_eq!(applied(&selector), ZRange::new(3.0, 6.0));
    assert!(!selector.viewer().fade().unwrap().has_image(FadeLayer::Snapshot));
}

#[test]
fn test_camera_change_while_hovering_keeps_ghosts() {
    let mut selector = selector();
    selector.enter_hover_mode();
    selector.tick(ms(100));

    selector.on_camera_changed();
    assert!(selector.is_animating());
    assert!(selector.holds_cross_fade());
}

#[test]
fn test_ao_backup_restored_despite_drift() {
    let mut selector = selector();
    selector.viewer_mut().ao.opacity = 0.8;
    selector.enter_hover_mode();
    assert_eq!(selector.viewer().ao.opacity, 0.0);

    // someone else touches AO while hidden
    selector.viewer_mut().ao.opacity = 0.3;

    selector.exit_hover_mode(false);
    selector.tick(ms(1000));
    assert_eq!(selector.viewer().ao.opacity, 0.8);
    assert_eq!(selector.viewer().ao.radius, 10.0);
}

#[test]
fn test_preemption_collapses_to_off() {
    let mut selector = selector();
    selector.select_floor(Some(0), false).unwrap();
    selector.enter_hover_mode();
    selector.tick(ms(100));

    selector
        .viewer_mut()
        .fade_mut()
        .unwrap()
        .preempt("section-tool");
    selector.tick(ms(16));

    assert_eq!(selector.render_mode(), RenderMode::Off);
    assert!(!selector.holds_cross_fade());
    assert!(!selector.is_ao_hidden());
    assert_eq!(selector.ghost_opacity(), 0.0);
    assert_eq!(applied(&selector), ZRange::new(0.0, 3.0));
    assert_eq!(
        selector.viewer().fade().unwrap().owner.as_deref(),
        Some("section-tool")
    );

    // hover intent is kept; a new hover cycle takes the layers back
    assert!(selector.is_hovering());
    selector.exit_hover_mode(false);
    selector.enter_hover_mode();
    assert!(selector.holds_cross_fade());
}

#[test]
fn test_preemption_notification_is_immediate() {
    let mut selector = selector();
    selector.enter_hover_mode();
    selector.on_cross_fade_preempted();
    assert_eq!(selector.render_mode(), RenderMode::Off);
    assert!(!selector.is_animating());
}

#[test]
fn test_preempted_layers_untouched_by_selection() {
    let mut selector = selector();
    selector.enter_hover_mode();
    selector.tick(ms(100));

    // The new owner sets the layers up its own way; no tick in between.
    {
        let fade = selector.viewer_mut().fade_mut().unwrap();
        fade.preempt("section-tool");
        fade.target = None;
        fade.clear_enabled = [true, true];
        fade.opacity = [0.7, 0.7];
        fade.sao_heuristic = true;
    }

    selector.select_floor(Some(1), true).unwrap();
    selector.roll_over_floor(RollOver::Floor(0));

    let check_layers = |selector: &FloorSelector<RecordingViewer>| {
        let fade = selector.viewer().fade().unwrap();
        assert_eq!(fade.owner.as_deref(), Some("section-tool"));
        assert_eq!(fade.target, None);
        assert_eq!(fade.clear_enabled, [true, true]);
        assert_relative_eq!(fade.opacity(FadeLayer::Snapshot), 0.7);
        assert_relative_eq!(fade.opacity(FadeLayer::Ghost), 0.7);
        assert!(fade.sao_heuristic);
    };
    check_layers(&selector);
    assert!(!selector.holds_cross_fade());

    // The transition still moves the cut planes, then settles without the
    // layers instead of re-entering hover mode.
    for _ in 0..100 {
        selector.tick(ms(16));
    }
    assert!(!selector.is_animating());
    assert_eq!(selector.render_mode(), RenderMode::Off);
    assert_eq!(applied(&selector), ZRange::new(3.0, 6.0));
    assert!(!selector.is_ao_hidden());
    check_layers(&selector);

    selector.exit_hover_mode(false);
    selector.enter_hover_mode();
    assert!(selector.holds_cross_fade());
    assert_eq!(
        selector.viewer().fade().unwrap().target,
        Some(FadeLayer::Ghost)
    );
}

#[test]
fn test_oversized_fading_time_still_animates() {
    let config = SelectorConfig {
        fading_time_secs: 1e300,
        ..Default::default()
    };
    let mut selector = FloorSelector::new(viewer(), config);
    selector.set_floor_data(floors()).unwrap();

    selector.enter_hover_mode();
    selector.select_floor(Some(0), true).unwrap();
    selector.tick(ms(600));
    assert_eq!(applied(&selector), ZRange::new(0.0, 3.0));
    assert_eq!(selector.render_mode(), RenderMode::Hovering);

    selector.tick(ms(600));
    assert!(!selector.is_animating());
}

#[test]
fn test_resize_rerenders_ghost_floors() {
    let mut selector = selector();
    selector.enter_hover_mode();
    selector.tick(ms(100));

    selector.on_viewer_resized();

    assert_eq!(selector.render_mode(), RenderMode::Hovering);
    assert!(selector.is_hovering());
    assert!(!selector.is_animating());
    assert_relative_eq!(selector.ghost_opacity(), 0.2);
    assert_eq!(selector.viewer().fade().unwrap().snapshot_renders, 2);
}

#[test]
fn test_panel_hover_effect_disabled() {
    let mut selector = selector();
    selector.enter_hover_mode();
    selector.set_panel_hover_effect_enabled(false);

    assert_eq!(selector.render_mode(), RenderMode::Off);
    assert!(!selector.holds_cross_fade());
    assert!(!selector.is_ao_hidden());

    selector.enter_hover_mode();
    assert_eq!(selector.render_mode(), RenderMode::Hovering);
    assert!(!selector.holds_cross_fade());
    assert!(!selector.is_ao_hidden());
}

#[test]
fn test_disabled_selector_clears_planes() {
    let mut selector = selector();
    selector.select_floor(Some(1), false).unwrap();

    selector.set_enabled(false);
    assert!(selector
        .viewer()
        .applied_section(CUT_PLANE_SET_NAME)
        .is_none());

    selector.set_enabled(true);
    assert_eq!(applied(&selector), ZRange::new(3.0, 6.0));
}

#[test]
fn test_is_visible_boundaries() {
    let mut selector = selector();
    assert!(selector.is_visible(ModelId(1), 12));

    selector.select_floor(Some(1), false).unwrap();
    assert!(selector.is_visible(ModelId(1), 10));
    // touching z_max stays visible, strictly above is cut
    assert!(selector.is_visible(ModelId(1), 11));
    assert!(!selector.is_visible(ModelId(1), 12));
    // touching z_min
    assert!(selector.is_visible(ModelId(1), 13));
}

#[test]
fn test_selection_runs_floor_filter() {
    let mut selector = selector();
    let mut ids = FxHashMap::default();
    ids.insert(ModelId(1), vec![10, 13]);
    selector
        .set_floor_filter_data(Some(FloorFilterData::new(ids)))
        .unwrap();

    selector.select_floor(Some(1), false).unwrap();
    // band of floor 1 is [4.5, 6.3]
    assert!(selector.viewer().is_hidden(ModelId(1), 10));
    assert!(!selector.viewer().is_hidden(ModelId(1), 13));
    assert!(!selector.is_visible(ModelId(1), 10));

    selector.select_floor(None, false).unwrap();
    assert!(!selector.viewer().is_hidden(ModelId(1), 10));
}

#[test]
fn test_invalid_filter_data_rejected() {
    let mut selector = selector();
    let data = FloorFilterData::default().with_level_height_factor(1.0);
    assert!(selector.set_floor_filter_data(Some(data)).is_err());
    assert!(selector.floor_filter_data().is_none());
}

#[test]
fn test_model_unload_drops_bookkeeping() {
    let mut selector = selector();
    let mut ids = FxHashMap::default();
    ids.insert(ModelId(1), vec![10]);
    selector
        .set_floor_filter_data(Some(FloorFilterData::new(ids)))
        .unwrap();
    selector.select_floor(Some(1), false).unwrap();

    selector.viewer_mut().remove_model(ModelId(1));
    selector.on_model_unloaded(ModelId(1));
    assert!(selector.floor_filter().hidden_ids(ModelId(1)).is_none());
}

#[test]
fn test_invalidate_out_of_range_selects_all() {
    let mut selector = selector();
    selector.select_floor(Some(1), false).unwrap();
    selector.invalidate_floor_selection(Some(5)).unwrap();
    assert_eq!(selector.current_floor(), None);
    assert_eq!(applied(&selector), ZRange::new(MIN_Z_LIMIT, MAX_Z_LIMIT));
}

#[test]
fn test_shutdown_returns_clean_viewer() {
    let mut selector = selector();
    selector.select_floor(Some(1), false).unwrap();
    selector.enter_hover_mode();

    let viewer = selector.shutdown();
    assert!(viewer.applied_section(CUT_PLANE_SET_NAME).is_none());
    assert_eq!(viewer.ao.opacity, 1.0);
    assert!(viewer.fade().unwrap().owner.is_none());
}
