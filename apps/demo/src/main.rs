// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! floorview demo - a scripted level panel session.
//!
//! Derives levels from AEC model data, wires a [`LevelsExtension`] to the
//! in-memory recording viewer and plays the interactions of a user working
//! with the level panel:
//!
//! - camera moves across levels
//! - hovering the panel (ghost floors) and its items (rollover)
//! - selecting a level, viewer resize, leaving the panel
//! - persisting and restoring the selection
//!
//! Set `FLOORVIEW_DATA` to run against another AEC model data file and
//! `RUST_LOG` to adjust the log output.

use anyhow::{Context, Result};
use floorview_core::{aec_model_data_to_levels, AecModelData, Floor, ModelId, WorldBox};
use floorview_selector::{
    HostEvent, LevelSource, LevelsEvent, LevelsExtension, LevelsState, RecordedModel,
    RecordingViewer, SelectorEvent, CUT_PLANE_SET_NAME,
};
use nalgebra::Point3;

mod config;

use config::Config;

const SAMPLE_DATA: &str = include_str!("../data/tower.json");

const MAIN_MODEL: ModelId = ModelId(1);

/// Half thickness of the generated slabs.
const SLAB_HALF_THICKNESS: f64 = 0.15;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,floorview_selector=debug".into()),
        )
        .init();

    let config = Config::from_env();
    tracing::info!(
        data = ?config.data_path,
        tick_ms = config.tick_ms,
        fading_time_secs = config.selector.fading_time_secs,
        max_ghost_opacity = config.selector.max_ghost_opacity,
        "Starting floorview demo"
    );

    let json = match &config.data_path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => SAMPLE_DATA.to_string(),
    };
    let data = AecModelData::from_json(&json).context("invalid AEC model data")?;

    let viewer = build_viewer(&data)?;
    let mut levels = LevelsExtension::new(viewer, config.selector.clone());
    subscribe_logging(&mut levels);

    levels
        .set_level_source(Some(LevelSource::Aec(data)), Some(MAIN_MODEL))
        .context("failed to derive levels")?;

    let floors = levels.selector().floor_data().to_vec();
    anyhow::ensure!(!floors.is_empty(), "model data contains no building stories");
    for item in levels.panel_items() {
        tracing::info!(index = item.index, level = %item.text, "panel item");
    }

    run_session(&mut levels, &floors, &config)?;

    let viewer = levels.unload()?;
    tracing::info!(
        cut_plane_updates = viewer.cut_plane_updates,
        snapshot_renders = viewer.fade().map_or(0, |fade| fade.snapshot_renders),
        invalidations = viewer.invalidations,
        section_left = viewer.applied_section(CUT_PLANE_SET_NAME).is_some(),
        "Session finished"
    );
    Ok(())
}

/// One 3D model spanning all stories, with a slab at every story boundary
/// for each level occluder id.
fn build_viewer(data: &AecModelData) -> Result<RecordingViewer> {
    let floors = aec_model_data_to_levels(data, None, None)?;
    let (Some(lowest), Some(highest)) = (floors.first(), floors.last()) else {
        return Ok(RecordingViewer::new());
    };

    let mut model = RecordedModel::new(MAIN_MODEL, WorldBox::from_z(lowest.z_min, highest.z_max));
    for (&db_id, floor) in data.level_occluder_ids.iter().zip(floors.iter().cycle()) {
        model = model.with_node(
            db_id,
            WorldBox::from_z(floor.z_max - SLAB_HALF_THICKNESS, floor.z_max + SLAB_HALF_THICKNESS),
        );
    }

    Ok(RecordingViewer::new().with_model(model))
}

fn subscribe_logging(levels: &mut LevelsExtension<RecordingViewer>) {
    levels.subscribe(|event| match event {
        LevelsEvent::LevelChanged { level } => {
            tracing::info!(level = %level.name, guid = %level.guid, "camera level changed");
        }
    });
    levels.selector_mut().subscribe(|event| match event {
        SelectorEvent::SelectedFloorChanged { floor } => {
            tracing::info!(floor = ?floor, "selected floor changed");
        }
        SelectorEvent::FloorDataChanged { floors } => {
            tracing::info!(floors = floors.len(), "floor data changed");
        }
    });
}

fn run_session(
    levels: &mut LevelsExtension<RecordingViewer>,
    floors: &[Floor],
    config: &Config,
) -> Result<()> {
    // Walk the camera up through the building.
    for floor in floors {
        let position = Point3::new(0.0, 0.0, floor.band().midpoint());
        levels.handle_event(HostEvent::CameraChanged { position })?;
    }

    let target = floors.len() / 2;

    levels.on_panel_mouse_enter();
    run_frames(levels, config);
    log_status(levels, "ghost floors shown");

    levels.on_item_mouse_enter(target);
    levels.on_item_mouse_leave(target);

    levels.on_item_selected(target)?;
    run_frames(levels, config);
    log_status(levels, "level selected");

    levels.handle_event(HostEvent::ViewerResized)?;
    levels.on_panel_mouse_leave();
    run_frames(levels, config);
    log_status(levels, "panel left");

    let state = levels.state();
    let persisted = serde_json::to_string(&state)?;
    tracing::info!(state = %persisted, "persisted state");

    let all_floors: LevelsState = serde_json::from_str(r#"{ "floorGuid": null }"#)?;
    levels.restore_state(&all_floors)?;
    log_status(levels, "all floors restored");

    let restored: LevelsState = serde_json::from_str(&persisted)?;
    levels.restore_state(&restored)?;
    log_status(levels, "persisted state restored");

    Ok(())
}

/// Ticks until all animations are done.
fn run_frames(levels: &mut LevelsExtension<RecordingViewer>, config: &Config) -> usize {
    let mut frames = 0;
    while levels.selector().is_animating() && frames < config.max_frames {
        levels.tick(config.tick_interval());
        frames += 1;
    }
    if levels.selector().is_animating() {
        tracing::warn!(frames, "animations still running after frame limit");
    }
    frames
}

fn log_status(levels: &LevelsExtension<RecordingViewer>, step: &str) {
    let selector = levels.selector();
    let section = levels.viewer().applied_section(CUT_PLANE_SET_NAME);
    let hidden = levels
        .viewer()
        .model(MAIN_MODEL)
        .and_then(|model| model.visibility.as_ref())
        .map_or(0, |visibility| visibility.hidden.len());

    tracing::info!(
        step,
        mode = ?selector.render_mode(),
        floor = ?selector.current_floor(),
        level = ?levels.current_level().map(|level| level.name.as_str()),
        section = ?section.map(|range| (range.min, range.max)),
        ghost_opacity = selector.ghost_opacity(),
        ao_hidden = selector.is_ao_hidden(),
        hidden,
        "status"
    );
}
