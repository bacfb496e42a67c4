//! Frame data shared between the RLBot host and Lua bot scripts.
//!
//! This crate holds the plain data that crosses the sandbox boundary each
//! tick. It has no knowledge of Lua or Python; the host crate serializes
//! these types into script tables and the Python crate extracts them from
//! the framework's ctypes structures.
//!
//! # Architecture
//!
//! - **`GameTickPacket`**: read-only snapshot of cars, ball, boost pads,
//!   teams and match info for one simulation tick.
//! - **`BallPrediction`**: predicted ball path, fetched on demand by scripts.
//! - **`ControllerLayout`**: the externally supplied arity and field order
//!   of the control-output record.
//! - **`ControllerState`**: one tick's control output, only constructible
//!   from exactly the values its layout expects.
//! - **`AgentIndex`**: which car a sandbox drives.
//!
//! # Example
//!
//! ```
//! use rlbot_lua_packet::{ControlValue, ControllerLayout, ControllerState};
//!
//! let layout = ControllerLayout::standard();
//! let values = vec![
//!     ControlValue::Analog(1.0),
//!     ControlValue::Analog(-0.5),
//!     ControlValue::Analog(0.0),
//!     ControlValue::Analog(0.0),
//!     ControlValue::Analog(0.0),
//!     ControlValue::Button(false),
//!     ControlValue::Button(true),
//!     ControlValue::Button(false),
//! ];
//! let state = ControllerState::from_values(&layout, values).unwrap();
//! assert_eq!(state.analog("steer"), Some(-0.5));
//! assert_eq!(state.button("boost"), Some(true));
//! ```

#![deny(unsafe_code)]

pub mod controller;
pub mod packet;
pub mod prediction;

pub use controller::{ControlField, ControlKind, ControlValue, ControllerLayout, ControllerState};
pub use packet::{
    BallInfo, BoostPadState, BoxShape, CollisionShape, CylinderShape, DropShotInfo, GameInfo,
    GameTickPacket, Physics, PlayerInfo, Rotator, SphereShape, TeamInfo, Touch, Vector3,
    MAX_BOOSTS, MAX_PLAYERS, MAX_TEAMS,
};
pub use prediction::{BallPrediction, PredictionSlice};

// ---------------------------------------------------------------------------
// Agent index
// ---------------------------------------------------------------------------

/// Index of the car an agent controls, as assigned by the host framework.
///
/// Zero-based on the Rust side. Lua scripts see [`lua_index`](Self::lua_index),
/// which is one-based to match Lua sequence indexing into `game_cars`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct AgentIndex(pub u32);

impl AgentIndex {
    /// Returns the one-based index handed to scripts.
    pub fn lua_index(self) -> i64 {
        i64::from(self.0) + 1
    }
}

impl std::fmt::Display for AgentIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for AgentIndex {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced when building a layout or a controller record.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ControlError {
    /// The number of values does not match the layout's field count.
    #[error("controller layout expects {expected} values, got {got}")]
    ArityMismatch {
        /// Field count of the layout.
        expected: usize,
        /// Number of values supplied.
        got: usize,
    },

    /// A value's type does not match the kind declared for its field.
    #[error("field '{field}' expects {expected}, got {found}")]
    KindMismatch {
        /// Name of the offending field.
        field: String,
        /// Kind declared by the layout.
        expected: ControlKind,
        /// Description of the value that was supplied.
        found: String,
    },

    /// A layout must declare at least one field.
    #[error("controller layout must declare at least one field")]
    EmptyLayout,

    /// Two fields in a layout share a name.
    #[error("controller layout declares field '{0}' more than once")]
    DuplicateField(String),
}
