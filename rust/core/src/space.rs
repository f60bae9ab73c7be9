// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tagged coordinate spaces for elevations.
//!
//! Level metadata arrives in project coordinates (as authored in the design
//! tool), while cut planes, bounding boxes and the camera live in world
//! coordinates (viewer space, including any global offset). Elevations carry
//! their space as a type parameter, so a project elevation can only reach
//! world space through an explicit [`SpaceTransform`].

use std::marker::PhantomData;

use nalgebra::{Matrix4, Point3};

use crate::error::{Error, Result};

/// Project coordinates of the authoring tool, as stored in level metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProjectSpace;

/// World coordinates of the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WorldSpace;

/// A z value tagged with the coordinate space it is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Elevation<S> {
    value: f64,
    space: PhantomData<S>,
}

impl<S> Elevation<S> {
    #[inline]
    pub const fn new(value: f64) -> Self {
        Self {
            value,
            space: PhantomData,
        }
    }

    #[inline]
    pub fn value(self) -> f64 {
        self.value
    }

    /// Shifts the elevation within its own space.
    #[inline]
    pub fn offset(self, delta: f64) -> Self {
        Self::new(self.value + delta)
    }
}

/// Affine transform from space `From` to space `To`.
#[derive(Debug, Clone, PartialEq)]
pub struct SpaceTransform<From, To> {
    matrix: Matrix4<f64>,
    spaces: PhantomData<(From, To)>,
}

impl<From, To> SpaceTransform<From, To> {
    pub fn identity() -> Self {
        Self::from_matrix(Matrix4::identity())
    }

    pub fn from_matrix(matrix: Matrix4<f64>) -> Self {
        Self {
            matrix,
            spaces: PhantomData,
        }
    }

    /// Reads a 3x4 affine transform stored as 12 floats in column-major
    /// order: three basis columns followed by the translation.
    pub fn from_array12(values: &[f64]) -> Result<Self> {
        if values.len() != 12 {
            return Err(Error::InvalidTransform(values.len()));
        }

        #[rustfmt::skip]
        let columns = [
            values[0], values[1], values[2], 0.0,
            values[3], values[4], values[5], 0.0,
            values[6], values[7], values[8], 0.0,
            values[9], values[10], values[11], 1.0,
        ];
        Ok(Self::from_matrix(Matrix4::from_column_slice(&columns)))
    }

    /// Pure translation along z, handy for global offsets.
    pub fn translation_z(dz: f64) -> Self {
        let mut matrix = Matrix4::identity();
        matrix[(2, 3)] = dz;
        Self::from_matrix(matrix)
    }

    #[inline]
    pub fn matrix(&self) -> &Matrix4<f64> {
        &self.matrix
    }

    /// Maps an elevation by transforming the point `(0, 0, z)` and keeping
    /// its z component.
    pub fn apply(&self, elevation: Elevation<From>) -> Elevation<To> {
        let p = self
            .matrix
            .transform_point(&Point3::new(0.0, 0.0, elevation.value()));
        Elevation::new(p.z)
    }

    /// Composes `self` followed by `next`.
    pub fn then<Next>(&self, next: &SpaceTransform<To, Next>) -> SpaceTransform<From, Next> {
        SpaceTransform::from_matrix(next.matrix * self.matrix)
    }
}
