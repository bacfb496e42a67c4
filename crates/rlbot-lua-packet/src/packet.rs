//! Per-tick game state snapshot.
//!
//! Field names match the keys bot scripts read (`packet.game_cars[i].physics.location.x`
//! and so on). Counts such as `num_cars` are not stored: they are derived
//! from the vector lengths when the script table is built, so the two can
//! never disagree.

use serde::{Deserialize, Serialize};

/// Upper bound on cars the framework reports in one packet.
pub const MAX_PLAYERS: usize = 64;

/// Upper bound on boost pads the framework reports in one packet.
pub const MAX_BOOSTS: usize = 50;

/// Upper bound on teams the framework reports in one packet.
pub const MAX_TEAMS: usize = 2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Orientation in radians.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rotator {
    pub pitch: f32,
    pub yaw: f32,
    pub roll: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Physics {
    pub location: Vector3,
    pub velocity: Vector3,
    pub angular_velocity: Vector3,
    pub rotation: Rotator,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoxShape {
    pub length: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerInfo {
    pub physics: Physics,
    pub is_demolished: bool,
    pub has_wheel_contact: bool,
    pub is_super_sonic: bool,
    pub is_bot: bool,
    pub jumped: bool,
    pub double_jumped: bool,
    pub name: String,
    pub team: u8,
    pub boost: f32,
    pub hitbox: BoxShape,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostPadState {
    pub is_active: bool,
    /// Seconds since the pad was picked up.
    pub timer: f32,
}

/// The most recent car touch on the ball.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Touch {
    pub player_name: String,
    pub time_seconds: f32,
    pub hit_location: Vector3,
    pub hit_normal: Vector3,
    pub team: i32,
    pub player_index: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DropShotInfo {
    pub damage_index: i32,
    pub absorbed_force: f32,
    pub force_accum_recent: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SphereShape {
    pub diameter: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CylinderShape {
    pub diameter: f32,
    pub height: f32,
}

/// Ball collision shape. `shape_type` selects which of the three shapes is
/// live (0 = box, 1 = sphere, 2 = cylinder); all three are always present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionShape {
    #[serde(rename = "type")]
    pub shape_type: u8,
    #[serde(rename = "box")]
    pub box_shape: BoxShape,
    pub sphere: SphereShape,
    pub cylinder: CylinderShape,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BallInfo {
    pub physics: Physics,
    pub latest_touch: Touch,
    pub drop_shot_info: DropShotInfo,
    pub collision_shape: CollisionShape,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameInfo {
    pub seconds_elapsed: f32,
    pub game_time_remaining: f32,
    pub world_gravity_z: f32,
    pub game_speed: f32,
    pub is_overtime: bool,
    pub is_unlimited_time: bool,
    pub is_round_active: bool,
    pub is_kickoff_pause: bool,
    pub is_match_ended: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamInfo {
    pub team_index: i32,
    pub score: i32,
}

/// Everything a bot sees for one simulation tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameTickPacket {
    pub game_cars: Vec<PlayerInfo>,
    pub game_boosts: Vec<BoostPadState>,
    pub game_ball: BallInfo,
    pub game_info: GameInfo,
    pub teams: Vec<TeamInfo>,
}

impl GameTickPacket {
    /// A packet with `num_cars` cars and two teams, every value zeroed.
    pub fn zeroed(num_cars: usize) -> Self {
        Self {
            game_cars: vec![PlayerInfo::default(); num_cars.min(MAX_PLAYERS)],
            teams: (0..MAX_TEAMS as i32)
                .map(|team_index| TeamInfo {
                    team_index,
                    score: 0,
                })
                .collect(),
            ..Self::default()
        }
    }

    pub fn num_cars(&self) -> usize {
        self.game_cars.len()
    }

    pub fn num_boost(&self) -> usize {
        self.game_boosts.len()
    }

    pub fn num_teams(&self) -> usize {
        self.teams.len()
    }

    /// The car at zero-based `index`, if present.
    pub fn car(&self, index: usize) -> Option<&PlayerInfo> {
        self.game_cars.get(index)
    }
}
