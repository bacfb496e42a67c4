//! Predicted ball trajectory.

use serde::{Deserialize, Serialize};

use crate::packet::Physics;

/// Ball state at one future instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictionSlice {
    pub physics: Physics,
    /// Game clock time this slice predicts.
    pub game_seconds: f32,
}

/// A sequence of slices ordered by `game_seconds`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BallPrediction {
    pub slices: Vec<PredictionSlice>,
}

impl BallPrediction {
    pub fn num_slices(&self) -> usize {
        self.slices.len()
    }
}
