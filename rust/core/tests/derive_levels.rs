// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Level derivation from AEC model data as exported by the authoring tool.

use approx::assert_relative_eq;
use floorview_core::{
    aec_model_data_to_levels, map_camera_to_level, normalize_floors, AecModelData, Error, Floor,
    ModelId, SpaceTransform, LEVEL_Z_OFFSET,
};

const AEC_JSON: &str = r#"{
    "levels": [
        { "guid": "L0", "name": "Level 0", "elevation": 0.0, "height": 4.0 },
        {
            "guid": "L0.5", "name": "Mezzanine", "elevation": 2.0, "height": 2.0,
            "extension": { "buildingStory": false }
        },
        {
            "guid": "L1", "name": "Level 1", "elevation": 4.0, "height": 4.0,
            "extension": { "buildingStory": true, "projectElevation": 4.25 }
        },
        { "guid": "L2", "name": "Roof", "elevation": 8.0, "height": 1.5 }
    ],
    "refPointTransformation": [1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 100],
    "levelOccluderIds": [11, 12, 13]
}"#;

#[test]
fn test_levels_from_json() {
    let data = AecModelData::from_json(AEC_JSON).unwrap();
    assert_eq!(data.level_occluder_ids, vec![11, 12, 13]);

    let floors = aec_model_data_to_levels(&data, None, None).unwrap();
    let names: Vec<&str> = floors.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["Level 0", "Level 1", "Roof"]);

    // Reference point lifts everything by 100.
    assert_relative_eq!(floors[0].z_min, 100.0 - LEVEL_Z_OFFSET);
    assert_relative_eq!(floors[0].z_max, 104.25);
    assert_relative_eq!(floors[1].z_min, 104.25 - LEVEL_Z_OFFSET);
    assert_relative_eq!(floors[1].z_max, 108.0);
    assert_relative_eq!(floors[2].z_max, 109.5);

    for (i, floor) in floors.iter().enumerate() {
        assert_eq!(floor.index, i);
        assert!(floor.z_min < floor.z_max);
    }
}

#[test]
fn test_model_transform_applied_after_placement() {
    let data = AecModelData::from_json(AEC_JSON).unwrap();
    let placement = SpaceTransform::translation_z(0.0);
    let model_tf = SpaceTransform::translation_z(-2.0);

    let floors = aec_model_data_to_levels(&data, Some(&placement), Some(&model_tf)).unwrap();
    // Placement replaces the reference point transform entirely.
    assert_relative_eq!(floors[0].z_max, 2.25);

    let on_first = map_camera_to_level(&floors, 3.0).unwrap();
    assert_eq!(on_first.guid, "L1");
}

#[test]
fn test_malformed_ref_point() {
    let json = r#"{ "levels": [], "refPointTransformation": [1, 2, 3] }"#;
    let data = AecModelData::from_json(json).unwrap();
    let err = aec_model_data_to_levels(&data, None, None).unwrap_err();
    assert!(matches!(err, Error::InvalidTransform(3)));
}

#[test]
fn test_malformed_json() {
    let err = AecModelData::from_json(r#"{ "levels": 5 }"#).unwrap_err();
    assert!(matches!(err, Error::Parse(_)));
}

#[test]
fn test_floor_json_shape() {
    let floor = Floor::new(0, "g", "Ground", 0.0, 3.0).artificial();
    let value = serde_json::to_value(&floor).unwrap();
    assert_eq!(value["zMin"], 0.0);
    assert_eq!(value["isArtificial"], true);

    let parsed: Vec<Floor> =
        serde_json::from_str(r#"[{ "index": 4, "guid": "x", "name": "X", "zMin": 1, "zMax": 2 }]"#)
            .unwrap();
    let parsed = normalize_floors(parsed).unwrap();
    assert_eq!(parsed[0].index, 0);
    assert!(!parsed[0].is_artificial);
}

#[test]
fn test_model_id_is_transparent() {
    let id: ModelId = serde_json::from_str("42").unwrap();
    assert_eq!(id, ModelId(42));
    assert_eq!(id.to_string(), "42");
}
