// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for floor selection.

use thiserror::Error;

/// Result type for floor selection operations
pub type Result<T> = std::result::Result<T, Error>;

/// Contract violations reported to the caller of a mutating API.
///
/// Degraded conditions (missing instance trees, visibility control not yet
/// available, AO drift) are logged instead and never surface here.
#[derive(Error, Debug)]
pub enum Error {
    #[error("level height factor must be a number in [0, 1), got {0}")]
    InvalidLevelHeightFactor(f64),

    #[error("floor filter data is malformed: {0}")]
    MalformedFilterData(#[from] serde_json::Error),

    #[error("level data error: {0}")]
    Core(#[from] floorview_core::Error),
}
