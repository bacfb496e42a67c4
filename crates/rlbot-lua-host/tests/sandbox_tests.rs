//! Per-tick behavior of the Lua sandbox against the fixture scripts.

use std::path::{Path, PathBuf};
use std::rc::Rc;

use rlbot_lua_host::{BallPredictionSource, LuaSandbox, SandboxConfig, SandboxError};
use rlbot_lua_packet::{
    AgentIndex, BallPrediction, BoostPadState, ControlError, ControlValue, ControllerLayout,
    GameTickPacket, PredictionSlice, Vector3,
};

fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

fn load(bot: &str, index: u32) -> LuaSandbox {
    let config = SandboxConfig::new(fixtures_dir()).with_bot_script(bot);
    LuaSandbox::load(&config, AgentIndex(index))
        .unwrap_or_else(|e| panic!("failed to load {bot}: {e}"))
}

/// Copy every fixture (including subdirectories) into `dest`.
fn copy_fixtures(dest: &Path) {
    fn copy_dir(from: &Path, to: &Path) {
        std::fs::create_dir_all(to).unwrap();
        for entry in std::fs::read_dir(from).unwrap() {
            let entry = entry.unwrap();
            let target = to.join(entry.file_name());
            if entry.file_type().unwrap().is_dir() {
                copy_dir(&entry.path(), &target);
            } else {
                std::fs::copy(entry.path(), &target).unwrap();
            }
        }
    }
    copy_dir(&fixtures_dir(), dest);
}

// -- Output contract --------------------------------------------------------

#[test]
fn all_zero_packet_yields_neutral_controls() {
    let mut sandbox = load("zero_bot.lua", 0);
    let state = sandbox.get_output(&GameTickPacket::zeroed(2)).unwrap();

    assert_eq!(
        state.values(),
        &[
            ControlValue::Analog(0.0),
            ControlValue::Analog(0.0),
            ControlValue::Analog(0.0),
            ControlValue::Analog(0.0),
            ControlValue::Analog(0.0),
            ControlValue::Button(false),
            ControlValue::Button(false),
            ControlValue::Button(false),
        ]
    );
    assert_eq!(state.analog("throttle"), Some(0.0));
    assert_eq!(state.button("handbrake"), Some(false));
}

#[test]
fn seven_values_for_eight_fields_fails_construction() {
    let mut sandbox = load("seven_bot.lua", 0);
    let err = sandbox.get_output(&GameTickPacket::zeroed(1)).unwrap_err();

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
fn seven_values_match_a_seven_field_layout() {
    let mut fields = ControllerLayout::standard().fields().to_vec();
    fields.pop();
    let layout = ControllerLayout::new(fields).unwrap();
    let config = SandboxConfig::new(fixtures_dir())
        .with_bot_script("seven_bot.lua")
        .with_layout(layout);

    let mut sandbox = LuaSandbox::load(&config, AgentIndex(0)).unwrap();
    let state = sandbox.get_output(&GameTickPacket::zeroed(1)).unwrap();
    assert_eq!(state.values().len(), 7);
    assert_eq!(state.button("handbrake"), None);
}

#[test]
fn named_controller_object_follows_layout_order() {
    let config = SandboxConfig::new(fixtures_dir())
        .with_bot_script("named_bot.lua")
        .with_layout(ControllerLayout::simple_controller_state());
    let mut sandbox = LuaSandbox::load(&config, AgentIndex(0)).unwrap();

    let state = sandbox.get_output(&GameTickPacket::zeroed(1)).unwrap();
    assert_eq!(state.values()[0], ControlValue::Analog(-0.25), "steer first");
    assert_eq!(state.values()[1], ControlValue::Analog(1.0), "throttle second");
    assert_eq!(state.button("boost"), Some(true));
    assert_eq!(state.button("use_item"), Some(false));
}

#[test]
fn packet_fields_reach_the_script() {
    let mut sandbox = load("echo_bot.lua", 1);

    let mut packet = GameTickPacket::zeroed(3);
    packet.game_info.seconds_elapsed = 12.5;
    packet.game_cars[1].physics.location = Vector3::new(-300.0, 10.0, 17.0);
    packet.game_cars[1].boost = 48.0;
    packet.game_cars[1].is_super_sonic = true;
    packet.game_boosts = vec![BoostPadState::default(); 34];
    packet.game_ball.collision_shape.shape_type = 1;

    let state = sandbox.get_output(&packet).unwrap();
    assert_eq!(state.analog("throttle"), Some(12.5));
    assert_eq!(state.analog("steer"), Some(3.0), "num_cars");
    assert_eq!(state.analog("pitch"), Some(-300.0), "car 2 location.x");
    assert_eq!(state.analog("yaw"), Some(48.0), "car 2 boost");
    assert_eq!(state.analog("roll"), Some(34.0), "boost pad count");
    assert_eq!(state.button("jump"), Some(true), "GameTickPacket constructor ran");
    assert_eq!(state.button("boost"), Some(true), "is_super_sonic");
    assert_eq!(state.button("handbrake"), Some(true), "collision shape type");
}

// -- Failure handling -------------------------------------------------------

#[test]
fn runtime_error_propagates_and_sandbox_recovers() {
    let mut sandbox = load("error_bot.lua", 0);
    let packet = GameTickPacket::zeroed(1);

    assert!(sandbox.get_output(&packet).is_ok());

    let err = sandbox.get_output(&packet).unwrap_err();
    match &err {
        SandboxError::Runtime(message) => assert!(message.contains("even tick 2"), "got: {message}"),
        other => panic!("expected Runtime, got: {other:?}"),
    }
    assert!(!err.is_load_error());

    assert!(sandbox.get_output(&packet).is_ok(), "next tick runs normally");
}

#[test]
fn memory_cap_is_reported() {
    let mut config = SandboxConfig::new(fixtures_dir()).with_bot_script("memory_hog.lua");
    config.memory_limit_bytes = Some(8 * 1024 * 1024);
    let mut sandbox = LuaSandbox::load(&config, AgentIndex(0)).unwrap();

    let err = sandbox.get_output(&GameTickPacket::zeroed(1)).unwrap_err();
    assert!(
        matches!(
            err,
            SandboxError::MemoryLimitExceeded {
                limit_bytes: 8_388_608
            }
        ),
        "expected MemoryLimitExceeded, got: {err:?}"
    );
}

// -- Isolation --------------------------------------------------------------

#[test]
fn two_indices_have_independent_globals() {
    let mut first = load("counter_bot.lua", 0);
    let mut second = load("counter_bot.lua", 1);
    let packet = GameTickPacket::zeroed(2);

    for _ in 0..3 {
        first.get_output(&packet).unwrap();
    }
    let a = first.get_output(&packet).unwrap();
    let b = second.get_output(&packet).unwrap();

    assert_eq!(a.analog("throttle"), Some(4.0), "first sandbox counted its own ticks");
    assert_eq!(b.analog("throttle"), Some(1.0), "second sandbox starts fresh");
    assert_eq!(a.analog("steer"), Some(1.0), "index 0 is 1 in Lua");
    assert_eq!(b.analog("steer"), Some(2.0), "index 1 is 2 in Lua");
}

// -- Filesystem layout ------------------------------------------------------

#[test]
fn relocated_scripts_load_from_their_own_directory() {
    let dir = tempfile::tempdir().unwrap();
    let relocated = dir.path().join("moved").join("bot");
    copy_fixtures(&relocated);

    let config = SandboxConfig::new(&relocated).with_bot_script("chase_bot.lua");
    let mut sandbox = LuaSandbox::load(&config, AgentIndex(0)).unwrap();

    let mut packet = GameTickPacket::zeroed(1);
    packet.game_ball.physics.location = Vector3::new(0.0, 1000.0, 93.0);
    let state = sandbox.get_output(&packet).unwrap();

    assert_eq!(state.analog("throttle"), Some(1.0));
    let steer = state.analog("steer").unwrap();
    assert!(steer > 0.0, "ball is to the left of a yaw-0 car, steer={steer}");
}

#[test]
fn reload_picks_up_edited_script() {
    let dir = tempfile::tempdir().unwrap();
    copy_fixtures(dir.path());
    let config = SandboxConfig::new(dir.path()).with_bot_script("zero_bot.lua");
    let mut sandbox = LuaSandbox::load(&config, AgentIndex(0)).unwrap();
    let packet = GameTickPacket::zeroed(1);
    sandbox.get_output(&packet).unwrap();

    assert!(!sandbox.reload_if_changed().unwrap(), "nothing changed yet");

    let edited = std::fs::read_to_string(dir.path().join("zero_bot.lua"))
        .unwrap()
        .replacen("return 0.0, 0.0", "return 1.0, 0.0", 1);
    std::fs::write(dir.path().join("zero_bot.lua"), edited).unwrap();

    let old_digest = sandbox.script_digest().to_owned();
    assert!(sandbox.reload_if_changed().unwrap());
    assert_ne!(sandbox.script_digest(), old_digest);
    assert_eq!(sandbox.ticks_run(), 1, "tick count survives reload");

    let state = sandbox.get_output(&packet).unwrap();
    assert_eq!(state.analog("throttle"), Some(1.0));
}

#[test]
fn failed_reload_keeps_previous_scripts() {
    let dir = tempfile::tempdir().unwrap();
    copy_fixtures(dir.path());
    let config = SandboxConfig::new(dir.path()).with_bot_script("zero_bot.lua");
    let mut sandbox = LuaSandbox::load(&config, AgentIndex(0)).unwrap();
    let digest = sandbox.script_digest().to_owned();

    std::fs::write(dir.path().join("zero_bot.lua"), "return {").unwrap();
    let err = sandbox.reload().unwrap_err();
    assert!(matches!(err, SandboxError::Load { .. }), "got: {err:?}");

    assert_eq!(sandbox.script_digest(), digest);
    let state = sandbox.get_output(&GameTickPacket::zeroed(1)).unwrap();
    assert_eq!(state.analog("throttle"), Some(0.0));
}

// -- Host API ---------------------------------------------------------------

#[test]
fn ball_prediction_is_fetched_from_source() {
    let source: Rc<dyn BallPredictionSource> = Rc::new(|| -> anyhow::Result<BallPrediction> {
        Ok(BallPrediction {
            slices: (0..6)
                .map(|i| PredictionSlice {
                    game_seconds: 100.0 + i as f32 / 2.0,
                    ..Default::default()
                })
                .collect(),
        })
    });
    let config = SandboxConfig::new(fixtures_dir()).with_bot_script("prediction_bot.lua");
    let mut sandbox = LuaSandbox::load_with_prediction(&config, AgentIndex(0), source).unwrap();

    let state = sandbox.get_output(&GameTickPacket::zeroed(1)).unwrap();
    assert_eq!(state.analog("throttle"), Some(6.0));
    assert_eq!(state.analog("steer"), Some(102.5));
}

#[test]
fn ball_prediction_source_error_becomes_runtime_error() {
    let source: Rc<dyn BallPredictionSource> =
        Rc::new(|| -> anyhow::Result<BallPrediction> { anyhow::bail!("prediction unavailable") });
    let config = SandboxConfig::new(fixtures_dir()).with_bot_script("prediction_bot.lua");
    let mut sandbox = LuaSandbox::load_with_prediction(&config, AgentIndex(0), source).unwrap();

    let err = sandbox.get_output(&GameTickPacket::zeroed(1)).unwrap_err();
    match err {
        SandboxError::Runtime(message) => {
            assert!(message.contains("prediction unavailable"), "got: {message}")
        }
        other => panic!("expected Runtime, got: {other:?}"),
    }
}

#[test]
fn scripts_can_log_and_read_their_index() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("rlbot_lua=trace")
        .with_test_writer()
        .try_init();

    let mut sandbox = load("log_bot.lua", 2);
    let state = sandbox.get_output(&GameTickPacket::zeroed(3)).unwrap();
    assert_eq!(state.analog("throttle"), Some(3.0));
}
