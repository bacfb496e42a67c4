//! Conversion between frame data and Lua values.
//!
//! Outbound, packets and ball predictions are serialized into plain Lua
//! tables (with `num_*` counters alongside each array) and then handed to
//! the script's constructor global, if one is defined. Inbound, the
//! script's reply is read as an ordered tuple and checked against the
//! controller layout.

use mlua::{Lua, LuaSerdeExt, MultiValue, Table, TableExt, Value};
use rlbot_lua_packet::{
    BallInfo, BallPrediction, BoostPadState, ControlError, ControlField, ControlKind, ControlValue,
    ControllerLayout, ControllerState, GameInfo, GameTickPacket, PlayerInfo, PredictionSlice,
    TeamInfo,
};
use serde::Serialize;

use crate::SandboxError;

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// Script-facing shape of a [`GameTickPacket`].
#[derive(Serialize)]
struct PacketTable<'a> {
    num_cars: usize,
    game_cars: &'a [PlayerInfo],
    num_boost: usize,
    game_boosts: &'a [BoostPadState],
    game_ball: &'a BallInfo,
    game_info: &'a GameInfo,
    num_teams: usize,
    teams: &'a [TeamInfo],
}

impl<'a> From<&'a GameTickPacket> for PacketTable<'a> {
    fn from(packet: &'a GameTickPacket) -> Self {
        Self {
            num_cars: packet.game_cars.len(),
            game_cars: &packet.game_cars,
            num_boost: packet.game_boosts.len(),
            game_boosts: &packet.game_boosts,
            game_ball: &packet.game_ball,
            game_info: &packet.game_info,
            num_teams: packet.teams.len(),
            teams: &packet.teams,
        }
    }
}

/// Script-facing shape of a [`BallPrediction`].
#[derive(Serialize)]
struct PredictionTable<'a> {
    num_slices: usize,
    slices: &'a [PredictionSlice],
}

pub(crate) fn packet_to_lua<'lua>(
    lua: &'lua Lua,
    packet: &GameTickPacket,
) -> mlua::Result<Value<'lua>> {
    lua.to_value(&PacketTable::from(packet))
}

pub(crate) fn prediction_to_lua<'lua>(
    lua: &'lua Lua,
    prediction: &BallPrediction,
) -> mlua::Result<Value<'lua>> {
    lua.to_value(&PredictionTable {
        num_slices: prediction.num_slices(),
        slices: &prediction.slices,
    })
}

/// Pass `raw` through the global constructor `name`.
///
/// Accepts a plain function or a class table with a `__call` metamethod.
/// When the global is absent, `raw` is returned unchanged.
pub(crate) fn construct_with_global<'lua>(
    lua: &'lua Lua,
    name: &str,
    raw: Value<'lua>,
) -> mlua::Result<Value<'lua>> {
    match lua.globals().get::<_, Value>(name)? {
        Value::Nil => Ok(raw),
        Value::Function(constructor) => constructor.call(raw),
        Value::Table(class) => class.call(raw),
        other => Err(mlua::Error::RuntimeError(format!(
            "global '{name}' must be a function or class table, found {}",
            other.type_name()
        ))),
    }
}

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// Read the entry point's reply as a control record.
///
/// - Several return values form the tuple directly.
/// - A single table with a sequence part is read as the tuple.
/// - A single table without one is read by field name in layout order;
///   absent fields take their kind's zero value, but a table naming none
///   of the layout's fields is an arity error.
/// - Any other single value is a one-element tuple.
pub(crate) fn controls_from_reply(
    reply: MultiValue<'_>,
    layout: &ControllerLayout,
) -> Result<ControllerState, SandboxError> {
    let mut values = reply.into_vec();
    let tuple = if values.len() == 1 {
        match values.pop() {
            Some(Value::Table(table)) if table.raw_len() > 0 => table
                .sequence_values::<Value>()
                .collect::<mlua::Result<Vec<_>>>()
                .map_err(|e| SandboxError::Runtime(format!("failed to read control tuple: {e}")))?,
            Some(Value::Table(table)) => return named_controls(&table, layout),
            Some(other) => vec![other],
            None => Vec::new(),
        }
    } else {
        values
    };

    if tuple.len() != layout.len() {
        return Err(ControlError::ArityMismatch {
            expected: layout.len(),
            got: tuple.len(),
        }
        .into());
    }

    let converted = layout
        .fields()
        .iter()
        .zip(&tuple)
        .map(|(field, value)| control_value(field, value))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ControllerState::from_values(layout, converted)?)
}

fn named_controls(
    table: &Table<'_>,
    layout: &ControllerLayout,
) -> Result<ControllerState, SandboxError> {
    let mut converted = Vec::with_capacity(layout.len());
    let mut present = 0;
    for field in layout.fields() {
        let value: Value = table.get(field.name.as_str()).map_err(|e| {
            SandboxError::Runtime(format!("failed to read control field '{}': {e}", field.name))
        })?;
        converted.push(match value {
            Value::Nil => field.kind.zero(),
            other => {
                present += 1;
                control_value(field, &other)?
            }
        });
    }
    if present == 0 {
        return Err(ControlError::ArityMismatch {
            expected: layout.len(),
            got: 0,
        }
        .into());
    }
    Ok(ControllerState::from_values(layout, converted)?)
}

fn control_value(field: &ControlField, value: &Value<'_>) -> Result<ControlValue, ControlError> {
    match (field.kind, value) {
        (ControlKind::Analog, Value::Number(n)) => Ok(ControlValue::Analog(*n as f32)),
        (ControlKind::Analog, Value::Integer(i)) => Ok(ControlValue::Analog(*i as f32)),
        (ControlKind::Button, Value::Boolean(b)) => Ok(ControlValue::Button(*b)),
        (kind, other) => Err(ControlError::KindMismatch {
            field: field.name.clone(),
            expected: kind,
            found: describe(other),
        }),
    }
}

fn describe(value: &Value<'_>) -> String {
    match value {
        Value::Boolean(b) => format!("boolean {b}"),
        Value::Integer(i) => format!("number {i}"),
        Value::Number(n) => format!("number {n}"),
        other => other.type_name().to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply<'lua>(lua: &'lua Lua, code: &str) -> MultiValue<'lua> {
        lua.load(code).eval::<MultiValue>().unwrap()
    }

    #[test]
    fn multiple_returns_form_the_tuple() {
        let lua = Lua::new();
        let state = controls_from_reply(
            reply(&lua, "return 1, -1, 0, 0, 0.5, true, false, true"),
            &ControllerLayout::standard(),
        )
        .unwrap();

        assert_eq!(state.analog("throttle"), Some(1.0));
        assert_eq!(state.analog("steer"), Some(-1.0));
        assert_eq!(state.analog("roll"), Some(0.5));
        assert_eq!(state.button("jump"), Some(true));
        assert_eq!(state.button("handbrake"), Some(true));
    }

    #[test]
    fn sequence_table_forms_the_tuple() {
        let lua = Lua::new();
        let state = controls_from_reply(
            reply(&lua, "return {0.25, 0, 0, 0, 0, false, true, false}"),
            &ControllerLayout::standard(),
        )
        .unwrap();
        assert_eq!(state.analog("throttle"), Some(0.25));
        assert_eq!(state.button("boost"), Some(true));
    }

    #[test]
    fn named_table_is_read_in_layout_order() {
        let lua = Lua::new();
        let state = controls_from_reply(
            reply(&lua, "return {steer = 0.5, boost = true}"),
            &ControllerLayout::simple_controller_state(),
        )
        .unwrap();

        assert_eq!(state.values()[0], ControlValue::Analog(0.5));
        assert_eq!(state.analog("throttle"), Some(0.0));
        assert_eq!(state.button("boost"), Some(true));
        assert_eq!(state.button("use_item"), Some(false));
    }

    #[test]
    fn short_tuple_is_an_arity_error() {
        let lua = Lua::new();
        let err = controls_from_reply(
            reply(&lua, "return 0, 0, 0, 0, 0, false, false"),
            &ControllerLayout::standard(),
        )
        .unwrap_err();
        assert!(
            matches!(
                err,
                SandboxError::Control(ControlError::ArityMismatch {
                    expected: 8,
                    got: 7
                })
            ),
            "expected arity mismatch, got: {err:?}"
        );
    }

    #[test]
    fn empty_reply_is_an_arity_error() {
        let lua = Lua::new();
        let err = controls_from_reply(reply(&lua, "return"), &ControllerLayout::standard())
            .unwrap_err();
        assert!(matches!(
            err,
            SandboxError::Control(ControlError::ArityMismatch { got: 0, .. })
        ));
    }

    #[test]
    fn empty_table_reply_is_an_arity_error() {
        let lua = Lua::new();
        let err = controls_from_reply(reply(&lua, "return {}"), &ControllerLayout::standard())
            .unwrap_err();
        assert!(
            matches!(
                err,
                SandboxError::Control(ControlError::ArityMismatch {
                    expected: 8,
                    got: 0
                })
            ),
            "expected arity mismatch, got: {err:?}"
        );
    }

    #[test]
    fn table_without_layout_fields_is_an_arity_error() {
        let lua = Lua::new();
        let err = controls_from_reply(
            reply(&lua, "return {thrttle = 1, bost = true}"),
            &ControllerLayout::simple_controller_state(),
        )
        .unwrap_err();
        assert!(
            matches!(
                err,
                SandboxError::Control(ControlError::ArityMismatch {
                    expected: 9,
                    got: 0
                })
            ),
            "expected arity mismatch, got: {err:?}"
        );
    }

    #[test]
    fn memory_cap_while_building_packet_is_a_memory_error() {
        let lua = Lua::new();
        let mut packet = GameTickPacket::zeroed(64);
        for car in &mut packet.game_cars {
            car.name = "x".repeat(4096);
        }
        lua.set_memory_limit(lua.used_memory() + 32 * 1024).unwrap();

        let err = packet_to_lua(&lua, &packet).unwrap_err();
        assert!(
            crate::sandbox::is_memory_error(&err),
            "expected memory error, got: {err:?}"
        );
    }

    #[test]
    fn string_in_analog_slot_is_a_kind_error() {
        let lua = Lua::new();
        let err = controls_from_reply(
            reply(&lua, "return 'fast', 0, 0, 0, 0, false, false, false"),
            &ControllerLayout::standard(),
        )
        .unwrap_err();
        match err {
            SandboxError::Control(ControlError::KindMismatch { field, found, .. }) => {
                assert_eq!(field, "throttle");
                assert_eq!(found, "string");
            }
            other => panic!("expected KindMismatch, got: {other:?}"),
        }
    }

    #[test]
    fn packet_table_carries_counts_and_one_based_arrays() {
        let lua = Lua::new();
        let mut packet = GameTickPacket::zeroed(3);
        packet.game_cars[2].name = "third".to_owned();

        let value = packet_to_lua(&lua, &packet).unwrap();
        lua.globals().set("packet", value).unwrap();

        let (num_cars, name, num_teams): (i64, String, i64) = lua
            .load("return packet.num_cars, packet.game_cars[3].name, packet.num_teams")
            .eval()
            .unwrap();
        assert_eq!(num_cars, 3);
        assert_eq!(name, "third");
        assert_eq!(num_teams, 2);
    }

    #[test]
    fn missing_constructor_passes_raw_table_through() {
        let lua = Lua::new();
        let raw = lua.create_table().unwrap();
        raw.set("marker", 7).unwrap();

        let value = construct_with_global(&lua, "NoSuchClass", Value::Table(raw)).unwrap();
        match value {
            Value::Table(t) => assert_eq!(t.get::<_, i64>("marker").unwrap(), 7),
            other => panic!("expected table, got {}", other.type_name()),
        }
    }

    #[test]
    fn function_constructor_wraps_raw_value() {
        let lua = Lua::new();
        lua.load("function Wrap(raw) return { inner = raw, wrapped = true } end")
            .exec()
            .unwrap();

        let value = construct_with_global(&lua, "Wrap", Value::Integer(3)).unwrap();
        let Value::Table(t) = value else {
            panic!("constructor should return a table");
        };
        assert!(t.get::<_, bool>("wrapped").unwrap());
        assert_eq!(t.get::<_, i64>("inner").unwrap(), 3);
    }
}
