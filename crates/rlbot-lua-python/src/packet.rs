//! Reading the framework's ctypes structures into Rust frame data.
//!
//! The host exposes packets as nested ctypes structures: scalars and
//! sub-structures by attribute, fixed-size arrays by index with a separate
//! `num_*` count. Counts are clamped to the array capacities so a corrupt
//! count can never index past the end.
//!
//! Sub-structures that older framework versions lack (`hitbox`,
//! `drop_shot_info`, `collision_shape`) read as zeroed when absent.

use pyo3::prelude::*;
use rlbot_lua_packet::{
    BallInfo, BallPrediction, BoostPadState, BoxShape, CollisionShape, CylinderShape,
    DropShotInfo, GameInfo, GameTickPacket, Physics, PlayerInfo, PredictionSlice, Rotator,
    SphereShape, TeamInfo, Touch, Vector3, MAX_BOOSTS, MAX_PLAYERS, MAX_TEAMS,
};

/// Most slices the framework's prediction struct holds.
const MAX_SLICES: usize = 360;

fn attr<'py, T>(obj: &Bound<'py, PyAny>, name: &str) -> PyResult<T>
where
    T: FromPyObject<'py>,
{
    obj.getattr(name)?.extract()
}

/// Read a sub-structure with `read`, or its default if the attribute is
/// missing.
fn optional<'py, T, F>(obj: &Bound<'py, PyAny>, name: &str, read: F) -> PyResult<T>
where
    T: Default,
    F: FnOnce(&Bound<'py, PyAny>) -> PyResult<T>,
{
    if obj.hasattr(name)? {
        read(&obj.getattr(name)?)
    } else {
        Ok(T::default())
    }
}

/// Read `num_field` and clamp it to `max`. Negative counts read as zero.
fn count(obj: &Bound<'_, PyAny>, num_field: &str, max: usize) -> PyResult<usize> {
    let n: i64 = attr(obj, num_field)?;
    Ok(usize::try_from(n).unwrap_or(0).min(max))
}

fn items<'py, T, F>(
    obj: &Bound<'py, PyAny>,
    array_field: &str,
    n: usize,
    mut read: F,
) -> PyResult<Vec<T>>
where
    F: FnMut(&Bound<'py, PyAny>) -> PyResult<T>,
{
    let array = obj.getattr(array_field)?;
    (0..n).map(|i| read(&array.get_item(i)?)).collect()
}

fn vector(obj: &Bound<'_, PyAny>) -> PyResult<Vector3> {
    Ok(Vector3::new(attr(obj, "x")?, attr(obj, "y")?, attr(obj, "z")?))
}

fn rotator(obj: &Bound<'_, PyAny>) -> PyResult<Rotator> {
    Ok(Rotator {
        pitch: attr(obj, "pitch")?,
        yaw: attr(obj, "yaw")?,
        roll: attr(obj, "roll")?,
    })
}

fn physics(obj: &Bound<'_, PyAny>) -> PyResult<Physics> {
    Ok(Physics {
        location: vector(&obj.getattr("location")?)?,
        velocity: vector(&obj.getattr("velocity")?)?,
        angular_velocity: vector(&obj.getattr("angular_velocity")?)?,
        rotation: rotator(&obj.getattr("rotation")?)?,
    })
}

fn box_shape(obj: &Bound<'_, PyAny>) -> PyResult<BoxShape> {
    Ok(BoxShape {
        length: attr(obj, "length")?,
        width: attr(obj, "width")?,
        height: attr(obj, "height")?,
    })
}

fn player(obj: &Bound<'_, PyAny>) -> PyResult<PlayerInfo> {
    Ok(PlayerInfo {
        physics: physics(&obj.getattr("physics")?)?,
        is_demolished: attr(obj, "is_demolished")?,
        has_wheel_contact: attr(obj, "has_wheel_contact")?,
        is_super_sonic: attr(obj, "is_super_sonic")?,
        is_bot: attr(obj, "is_bot")?,
        jumped: attr(obj, "jumped")?,
        double_jumped: attr(obj, "double_jumped")?,
        name: attr(obj, "name")?,
        team: attr(obj, "team")?,
        boost: attr(obj, "boost")?,
        hitbox: optional(obj, "hitbox", box_shape)?,
    })
}

fn boost_pad(obj: &Bound<'_, PyAny>) -> PyResult<BoostPadState> {
    Ok(BoostPadState {
        is_active: attr(obj, "is_active")?,
        timer: attr(obj, "timer")?,
    })
}

fn touch(obj: &Bound<'_, PyAny>) -> PyResult<Touch> {
    Ok(Touch {
        player_name: attr(obj, "player_name")?,
        time_seconds: attr(obj, "time_seconds")?,
        hit_location: vector(&obj.getattr("hit_location")?)?,
        hit_normal: vector(&obj.getattr("hit_normal")?)?,
        team: attr(obj, "team")?,
        player_index: attr(obj, "player_index")?,
    })
}

fn drop_shot_info(obj: &Bound<'_, PyAny>) -> PyResult<DropShotInfo> {
    Ok(DropShotInfo {
        damage_index: attr(obj, "damage_index")?,
        absorbed_force: attr(obj, "absorbed_force")?,
        force_accum_recent: attr(obj, "force_accum_recent")?,
    })
}

fn collision_shape(obj: &Bound<'_, PyAny>) -> PyResult<CollisionShape> {
    let sphere = obj.getattr("sphere")?;
    let cylinder = obj.getattr("cylinder")?;
    Ok(CollisionShape {
        shape_type: attr(obj, "type")?,
        box_shape: box_shape(&obj.getattr("box")?)?,
        sphere: SphereShape {
            diameter: attr(&sphere, "diameter")?,
        },
        cylinder: CylinderShape {
            diameter: attr(&cylinder, "diameter")?,
            height: attr(&cylinder, "height")?,
        },
    })
}

fn ball(obj: &Bound<'_, PyAny>) -> PyResult<BallInfo> {
    Ok(BallInfo {
        physics: physics(&obj.getattr("physics")?)?,
        latest_touch: touch(&obj.getattr("latest_touch")?)?,
        drop_shot_info: optional(obj, "drop_shot_info", drop_shot_info)?,
        collision_shape: optional(obj, "collision_shape", collision_shape)?,
    })
}

fn game_info(obj: &Bound<'_, PyAny>) -> PyResult<GameInfo> {
    Ok(GameInfo {
        seconds_elapsed: attr(obj, "seconds_elapsed")?,
        game_time_remaining: attr(obj, "game_time_remaining")?,
        world_gravity_z: attr(obj, "world_gravity_z")?,
        game_speed: attr(obj, "game_speed")?,
        is_overtime: attr(obj, "is_overtime")?,
        is_unlimited_time: attr(obj, "is_unlimited_time")?,
        is_round_active: attr(obj, "is_round_active")?,
        is_kickoff_pause: attr(obj, "is_kickoff_pause")?,
        is_match_ended: attr(obj, "is_match_ended")?,
    })
}

fn team(obj: &Bound<'_, PyAny>) -> PyResult<TeamInfo> {
    Ok(TeamInfo {
        team_index: attr(obj, "team_index")?,
        score: attr(obj, "score")?,
    })
}

/// Copy a host `GameTickPacket` into Rust.
pub(crate) fn extract_packet(packet: &Bound<'_, PyAny>) -> PyResult<GameTickPacket> {
    let num_cars = count(packet, "num_cars", MAX_PLAYERS)?;
    let num_boost = count(packet, "num_boost", MAX_BOOSTS)?;
    let num_teams = count(packet, "num_teams", MAX_TEAMS)?;

    Ok(GameTickPacket {
        game_cars: items(packet, "game_cars", num_cars, player)?,
        game_boosts: items(packet, "game_boosts", num_boost, boost_pad)?,
        game_ball: ball(&packet.getattr("game_ball")?)?,
        game_info: game_info(&packet.getattr("game_info")?)?,
        teams: items(packet, "teams", num_teams, team)?,
    })
}

/// Copy a host `BallPrediction` struct into Rust.
pub(crate) fn extract_ball_prediction(prediction: &Bound<'_, PyAny>) -> PyResult<BallPrediction> {
    let num_slices = count(prediction, "num_slices", MAX_SLICES)?;
    let slices = items(prediction, "slices", num_slices, |slice| {
        Ok(PredictionSlice {
            physics: physics(&slice.getattr("physics")?)?,
            game_seconds: attr(slice, "game_seconds")?,
        })
    })?;
    Ok(BallPrediction { slices })
}
