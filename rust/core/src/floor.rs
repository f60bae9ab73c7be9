// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Floor records and the world-space primitives shared by the selector.
//!
//! All elevations in this module are world coordinates (viewer space).

use std::fmt;

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Identifier of a renderable object within a model's instance tree.
pub type DbId = u32;

/// Identity of a loaded model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelId(pub u32);

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Closed elevation interval `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZRange {
    pub min: f64,
    pub max: f64,
}

impl ZRange {
    #[inline]
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    #[inline]
    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    #[inline]
    pub fn midpoint(&self) -> f64 {
        0.5 * (self.min + self.max)
    }

    /// Inclusive containment test.
    #[inline]
    pub fn contains(&self, z: f64) -> bool {
        z >= self.min && z <= self.max
    }

    /// True if `[lo, hi]` lies completely outside this range.
    #[inline]
    pub fn excludes(&self, lo: f64, hi: f64) -> bool {
        lo > self.max || hi < self.min
    }
}

/// One building story, identified by its elevation band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Floor {
    /// Position in the ascending floor list.
    pub index: usize,
    pub guid: String,
    pub name: String,
    pub z_min: f64,
    pub z_max: f64,
    /// Level generated from a viewport rather than read from level metadata.
    #[serde(default)]
    pub is_artificial: bool,
}

impl Floor {
    pub fn new(
        index: usize,
        guid: impl Into<String>,
        name: impl Into<String>,
        z_min: f64,
        z_max: f64,
    ) -> Self {
        Self {
            index,
            guid: guid.into(),
            name: name.into(),
            z_min,
            z_max,
            is_artificial: false,
        }
    }

    /// Marks the floor as generated from a viewport.
    pub fn artificial(mut self) -> Self {
        self.is_artificial = true;
        self
    }

    #[inline]
    pub fn band(&self) -> ZRange {
        ZRange::new(self.z_min, self.z_max)
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.z_max - self.z_min
    }

    fn has_valid_band(&self) -> bool {
        self.z_min.is_finite() && self.z_max.is_finite() && self.z_min < self.z_max
    }
}

/// Checks every band and renumbers floors by position.
///
/// Floors must be sorted ascending: both bounds of every band lie strictly
/// above the bounds of the band before it. Adjacent bands may overlap, as
/// derived levels reach [`LEVEL_Z_OFFSET`](crate::LEVEL_Z_OFFSET) below
/// their story elevation.
pub fn normalize_floors(mut floors: Vec<Floor>) -> Result<Vec<Floor>> {
    let mut previous: Option<ZRange> = None;
    for (index, floor) in floors.iter_mut().enumerate() {
        if !floor.has_valid_band() {
            return Err(Error::InvalidFloorBand {
                index,
                name: floor.name.clone(),
                z_min: floor.z_min,
                z_max: floor.z_max,
            });
        }
        if let Some(prev) = previous {
            if floor.z_min <= prev.min || floor.z_max <= prev.max {
                return Err(Error::FloorsOutOfOrder {
                    index,
                    name: floor.name.clone(),
                });
            }
        }
        previous = Some(floor.band());
        floor.index = index;
    }
    Ok(floors)
}

/// Axis-aligned box in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldBox {
    pub min: Point3<f64>,
    pub max: Point3<f64>,
}

impl WorldBox {
    pub fn new(min: Point3<f64>, max: Point3<f64>) -> Self {
        Self { min, max }
    }

    /// Box spanning the full xy-plane with the given z extent.
    pub fn from_z(z_min: f64, z_max: f64) -> Self {
        Self::new(
            Point3::new(f64::MIN, f64::MIN, z_min),
            Point3::new(f64::MAX, f64::MAX, z_max),
        )
    }

    #[inline]
    pub fn z_range(&self) -> ZRange {
        ZRange::new(self.min.z, self.max.z)
    }
}

/// Finds the floor the camera is on.
///
/// Elevations below the lowest floor map to the lowest floor, elevations
/// above the topmost floor map to the topmost one.
pub fn map_camera_to_level(floors: &[Floor], camera_z: f64) -> Option<&Floor> {
    let first = floors.first()?;
    let last = floors.last()?;

    if camera_z < first.z_min {
        return Some(first);
    }
    if camera_z > last.z_max {
        return Some(last);
    }
    floors.iter().find(|f| f.band().contains(camera_z))
}

/// Elevation range used to section a single level for plan-like views.
///
/// Everything above the middle of the level is cut. Below, the cut is placed
/// at the middle of the level underneath, which keeps stairs leading down
/// visible.
pub fn level_z_range(floors: &[Floor], index: usize) -> Option<ZRange> {
    let floor = floors.get(index)?;
    let z_max = floor.z_min + 0.5 * floor.height();
    let z_min = index
        .checked_sub(1)
        .and_then(|below| floors.get(below))
        .map(|below| below.band().midpoint())
        .unwrap_or(floor.z_min);
    Some(ZRange::new(z_min, z_max))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn floors() -> Vec<Floor> {
        vec![
            Floor::new(0, "g0", "Ground", 0.0, 3.0),
            Floor::new(1, "g1", "First", 3.0, 6.0),
            Floor::new(2, "g2", "Roof", 6.0, 9.0),
        ]
    }

    #[test]
    fn test_normalize_renumbers() {
        let mut input = floors();
        input[0].index = 7;
        input[2].index = 0;
        let out = normalize_floors(input).unwrap();
        let indices: Vec<usize> = out.iter().map(|f| f.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_normalize_rejects_inverted_band() {
        let mut input = floors();
        input[1].z_max = 2.0;
        let err = normalize_floors(input).unwrap_err();
        assert!(matches!(err, Error::InvalidFloorBand { index: 1, .. }));
    }

    #[test]
    fn test_normalize_rejects_descending_floors() {
        let mut input = floors();
        input.swap(0, 1);
        let err = normalize_floors(input).unwrap_err();
        assert!(matches!(err, Error::FloorsOutOfOrder { index: 1, .. }));
    }

    #[test]
    fn test_normalize_rejects_duplicate_and_nested_bands() {
        let mut input = floors();
        input[1] = Floor::new(1, "dup", "Duplicate", 0.0, 3.0);
        let err = normalize_floors(input).unwrap_err();
        assert!(matches!(err, Error::FloorsOutOfOrder { index: 1, .. }));

        let mut input = floors();
        input[2] = Floor::new(2, "in", "Mezzanine", 4.0, 5.0);
        let err = normalize_floors(input).unwrap_err();
        assert!(matches!(err, Error::FloorsOutOfOrder { index: 2, .. }));
    }

    #[test]
    fn test_normalize_accepts_overlapping_neighbours() {
        let mut input = floors();
        input[1].z_min = 3.0 - crate::LEVEL_Z_OFFSET;
        input[2].z_min = 6.0 - crate::LEVEL_Z_OFFSET;
        let out = normalize_floors(input).unwrap();
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn test_normalize_rejects_nan() {
        let mut input = floors();
        input[2].z_min = f64::NAN;
        assert!(normalize_floors(input).is_err());
    }

    #[test]
    fn test_camera_mapping_clamps() {
        let floors = floors();
        assert_eq!(map_camera_to_level(&floors, -10.0).unwrap().guid, "g0");
        assert_eq!(map_camera_to_level(&floors, 100.0).unwrap().guid, "g2");
        assert_eq!(map_camera_to_level(&floors, 4.5).unwrap().guid, "g1");
        // Shared boundary resolves to the lower floor.
        assert_eq!(map_camera_to_level(&floors, 3.0).unwrap().guid, "g0");
        assert!(map_camera_to_level(&[], 1.0).is_none());
    }

    #[test]
    fn test_level_z_range() {
        let floors = floors();

        let ground = level_z_range(&floors, 0).unwrap();
        assert_relative_eq!(ground.min, 0.0);
        assert_relative_eq!(ground.max, 1.5);

        let first = level_z_range(&floors, 1).unwrap();
        assert_relative_eq!(first.min, 1.5);
        assert_relative_eq!(first.max, 4.5);

        assert!(level_z_range(&floors, 3).is_none());
    }

    #[test]
    fn test_zrange_excludes_is_strict() {
        let band = ZRange::new(3.0, 6.0);
        assert!(!band.excludes(6.0, 8.0));
        assert!(!band.excludes(1.0, 3.0));
        assert!(band.excludes(6.01, 8.0));
        assert!(band.excludes(0.0, 2.99));
    }
}
