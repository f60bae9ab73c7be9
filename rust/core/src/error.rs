// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for level data.

use thiserror::Error;

/// Result type alias for level data operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or validating floors.
#[derive(Debug, Error)]
pub enum Error {
    /// A floor's elevation band is empty, inverted or not finite.
    #[error("floor {index} ({name:?}) has an invalid elevation band [{z_min}, {z_max}]")]
    InvalidFloorBand {
        index: usize,
        name: String,
        z_min: f64,
        z_max: f64,
    },

    /// A floor does not lie above its predecessor.
    #[error("floor {index} ({name:?}) is not above the previous floor")]
    FloorsOutOfOrder { index: usize, name: String },

    /// A serialized 3x4 transform did not contain exactly 12 values.
    #[error("transform must contain 12 values, got {0}")]
    InvalidTransform(usize),

    /// Level metadata could not be parsed.
    #[error("level metadata could not be parsed: {0}")]
    Parse(#[from] serde_json::Error),
}
