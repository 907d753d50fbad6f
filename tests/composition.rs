//! Integration tests for board composition
//!
//! These tests run a full board description through every phase: declare,
//! define, startup-init, settings-sync and settings-update, then drive the
//! resulting drivers and peripherals against a fake board.

mod common;

use common::{FakeBoard, BOARD_TOML};
use printer_io::board::DriverSettings;
use printer_io::driver::tmc2130::reg;
use printer_io::{
    Composition, ConfigError, DeviceKind, Endstop, DriverError, DriverState, DriverStatus, Error, MemorySettings,
    Microsteps, SettingsStore, StepperDriver,
};

fn composition() -> Composition {
    Composition::from_toml(BOARD_TOML).expect("board table should be valid")
}

// =============================================================================
// Declare
// =============================================================================

#[test]
fn test_declare_lists_devices_in_table_order() {
    let composition = composition();
    let declared: Vec<_> = composition.declare().collect();

    assert_eq!(declared.len(), composition.table().len());
    assert_eq!(declared[0].name, "x_step");
    assert_eq!(declared[0].kind, DeviceKind::Output);
    assert_eq!(declared.last().map(|d| d.name), Some("led"));

    let x = declared.iter().find(|d| d.name == "x_motor").unwrap();
    assert_eq!(x.kind, DeviceKind::StepperTmc2130);
    let merge = declared.iter().find(|d| d.name == "y_any").unwrap();
    assert_eq!(merge.kind, DeviceKind::EndstopMerge);
}

// =============================================================================
// All phases
// =============================================================================

#[test]
fn test_full_bring_up() {
    let composition = composition();
    let mut board = FakeBoard::new();
    board.set_input(18, true); // inverted probe at rest

    let endstops = composition.define_endstops(&mut board).unwrap();
    assert_eq!(endstops.len(), 5);

    let _peripherals = composition.define_peripherals(&mut board).unwrap();
    let mut machine = composition.define_machine(&mut board, &endstops).unwrap();
    assert_eq!(machine.stepper_names().collect::<Vec<_>>(), ["x_motor", "y_motor", "e_motor"]);

    machine.startup_init().unwrap();
    let x = machine.stepper("x_motor").unwrap();
    assert_eq!(x.as_smart().map(|d| d.state()), Some(DriverState::Ready));

    let mut store = MemorySettings::new();
    machine.sync_settings(&mut store).unwrap();
    assert_eq!(store.len(), 1);
    assert_eq!(
        store.load("x_motor"),
        Some(DriverSettings { current_ma: 700, microsteps: Microsteps::SIXTEENTH })
    );
    assert!(store.load("y_motor").is_none());

    machine.apply_update().unwrap();
    assert_eq!(board.chip(40).borrow().microsteps(), 16);

    // enable is active low on the x driver
    assert!(board.rises(38) >= 1);
    assert!(!board.level(38));
}

#[test]
fn test_stored_settings_are_applied() {
    let composition = composition();
    let mut board = FakeBoard::new();
    let endstops = composition.define_endstops(&mut board).unwrap();
    let mut machine = composition.define_machine(&mut board, &endstops).unwrap();

    let mut store = MemorySettings::new();
    store
        .save("x_motor", &DriverSettings { current_ma: 500, microsteps: Microsteps::THIRTY_SECOND })
        .unwrap();

    machine.startup_init().unwrap();
    machine.sync_settings(&mut store).unwrap();
    machine.apply_update().unwrap();

    assert_eq!(machine.axis("x_motor").unwrap().settings().current_ma, 500);
    assert_eq!(board.chip(40).borrow().microsteps(), 32);

    let mut status = DriverStatus::default();
    let x = machine.stepper_mut("x_motor").unwrap();
    x.status(Some(&mut status)).unwrap();
    assert_eq!(status.label.as_str(), "x_motor");
    assert_eq!(status.microsteps, 32);
    assert!((450..=520).contains(&status.current_ma), "current {}", status.current_ma);
    assert_eq!(status.version, 0x11);
    assert_eq!(status.connection_test, 0);
    assert!(status.cs_active);
}

#[test]
fn test_dead_spi_faults_only_its_driver() {
    let composition = composition();
    let mut board = FakeBoard::new();
    board.chip(40).borrow_mut().alive = false;

    let endstops = composition.define_endstops(&mut board).unwrap();
    let mut machine = composition.define_machine(&mut board, &endstops).unwrap();

    let result = machine.startup_init();
    assert_eq!(result, Err(DriverError::InitFailed { count: 1 }));

    let x = machine.stepper("x_motor").unwrap().as_smart().unwrap();
    assert_eq!(x.state(), DriverState::Faulted);
    assert_eq!(x.connection_test(), 2);

    // nothing past the reset defaults reached the chip
    let chip = board.chip(40);
    let model = chip.borrow();
    assert_eq!(model.writes.iter().filter(|(address, _)| *address == reg::IHOLD_IRUN).count(), 1);
    assert!(!model.writes.iter().any(|&(address, value)| address == reg::TCOOLTHRS && value != 0));
    drop(model);

    let x = machine.stepper_mut("x_motor").unwrap();
    assert_eq!(x.set_motor_current(600), Err(DriverError::NotReady(DriverState::Faulted)));
}

// =============================================================================
// Endstop gating
// =============================================================================

#[test]
fn test_merged_endstop_gates_simple_driver() {
    let composition = composition();
    let mut board = FakeBoard::new();
    board.set_input(18, true);
    let endstops = composition.define_endstops(&mut board).unwrap();
    let mut machine = composition.define_machine(&mut board, &endstops).unwrap();
    machine.startup_init().unwrap();

    let y = machine.stepper_mut("y_motor").unwrap();
    y.dir(false).unwrap();
    assert!(!y.step_cond().unwrap());
    y.unstep().unwrap();
    assert_eq!(board.rises(60), 1);

    // y_min pressed
    board.set_input(14, true);
    let y = machine.stepper_mut("y_motor").unwrap();
    assert!(y.step_cond().unwrap());
    assert!(y.min_endstop().state());

    // probe pressed, y_min released
    board.set_input(14, false);
    board.set_input(18, false);
    let y = machine.stepper_mut("y_motor").unwrap();
    assert!(y.step_cond().unwrap());
    assert_eq!(board.rises(60), 1);

    // toward max there is no switch
    let y = machine.stepper_mut("y_motor").unwrap();
    y.dir(true).unwrap();
    assert!(!y.step_cond().unwrap());
    assert_eq!(board.rises(60), 2);
}

#[test]
fn test_switch_gates_smart_driver() {
    let composition = composition();
    let mut board = FakeBoard::new();
    board.set_input(18, true);
    let endstops = composition.define_endstops(&mut board).unwrap();
    let mut machine = composition.define_machine(&mut board, &endstops).unwrap();
    machine.startup_init().unwrap();

    board.set_input(3, true);
    let x = machine.stepper_mut("x_motor").unwrap();
    x.dir(false).unwrap();
    assert!(x.step_cond().unwrap());
    assert_eq!(board.rises(54), 0);
}

// =============================================================================
// Homing
// =============================================================================

#[test]
fn test_homing_switches_coolstep_threshold() {
    let composition = composition();
    let mut board = FakeBoard::new();
    let endstops = composition.define_endstops(&mut board).unwrap();
    let mut machine = composition.define_machine(&mut board, &endstops).unwrap();
    machine.startup_init().unwrap();
    let chip = board.chip(40);
    assert_eq!(chip.borrow().reg(reg::TCOOLTHRS), 300);

    let x = machine.stepper_mut("x_motor").unwrap();
    x.before_homing().unwrap();
    assert_eq!(chip.borrow().reg(reg::TCOOLTHRS), 1200);
    assert_eq!(chip.borrow().reg(reg::GCONF) & reg::GCONF_DIAG1_STALL, reg::GCONF_DIAG1_STALL);

    let x = machine.stepper_mut("x_motor").unwrap();
    x.after_homing().unwrap();
    assert_eq!(chip.borrow().reg(reg::TCOOLTHRS), 300);
    assert_eq!(chip.borrow().reg(reg::GCONF) & reg::GCONF_EN_PWM_MODE, 0);

    let x = machine.stepper("x_motor").unwrap().as_smart().unwrap();
    assert_eq!(x.state(), DriverState::Ready);
    assert!(x.homing_backup().is_none());
}

#[test]
fn test_simple_driver_homing_is_noop() {
    let composition = composition();
    let mut board = FakeBoard::new();
    let endstops = composition.define_endstops(&mut board).unwrap();
    let mut machine = composition.define_machine(&mut board, &endstops).unwrap();

    let y = machine.stepper_mut("y_motor").unwrap();
    assert!(!y.implements_set_max_current());
    y.before_homing().unwrap();
    y.after_homing().unwrap();
    y.set_microsteps(Microsteps::EIGHTH).unwrap();

    let mut status = DriverStatus::default();
    y.status(Some(&mut status)).unwrap();
    assert_eq!(status, DriverStatus::default());
}

// =============================================================================
// Peripherals and tools
// =============================================================================

#[test]
fn test_fan_kickstart_runs_then_releases() {
    let composition = composition();
    let mut board = FakeBoard::new();
    let mut peripherals = composition.define_peripherals(&mut board).unwrap();

    assert!(peripherals.pwm("fan_soft").is_none());
    let fan = peripherals.pwm_mut("fan").unwrap();
    assert!(fan.has_kickstart());

    fan.set_duty(100).unwrap();
    assert!(fan.is_kicking());
    peripherals.tick(50).unwrap();
    assert!(board.level(9));

    peripherals.tick(150).unwrap();
    let fan = peripherals.pwm("fan").unwrap();
    assert!(!fan.is_kicking());
    assert_eq!(fan.duty(), 100);
}

#[test]
fn test_heater_channels() {
    let composition = composition();
    let mut board = FakeBoard::new();
    board.adc(13).set(550);
    let mut peripherals = composition.define_peripherals(&mut board).unwrap();

    let heater = peripherals.heater("hotend").unwrap();
    assert_eq!(heater.config.symbol, 'T');
    assert_eq!(heater.sensor(), "hotend_temp");

    let (sensor, output) = peripherals.heater_channels_mut("hotend").unwrap();
    let celsius = sensor.read_celsius().unwrap();
    assert!((celsius - 160.0).abs() < 0.01, "read {}", celsius);
    output.set_duty(128).unwrap();
    assert_eq!(board.pwm_duty(10), 128);

    // only unclaimed pins are handed out directly
    assert!(peripherals.output_mut("led").is_some());
    assert!(peripherals.output_mut("fan_pin").is_none());
    assert!(peripherals.analog_mut("hotend_adc").is_none());
}

#[test]
fn test_tool_resolves_its_stepper() {
    let composition = composition();
    let mut board = FakeBoard::new();
    let endstops = composition.define_endstops(&mut board).unwrap();
    let mut machine = composition.define_machine(&mut board, &endstops).unwrap();

    let tool = machine.tool("extruder0").unwrap();
    assert_eq!(tool.heater(), "hotend");
    assert_eq!(tool.config.diameter, 1.75);

    let e = machine.tool_stepper_mut("extruder0").unwrap();
    assert_eq!(e.label(), "e_motor");
    e.step().unwrap();
    assert_eq!(board.rises(26), 1);
}

// =============================================================================
// Failures
// =============================================================================

#[test]
fn test_forward_reference_is_rejected() {
    let toml = r#"
[[devices]]
kind = "endstop_merge"
name = "any"
first = "a"
second = "b"

[[devices]]
kind = "endstop_none"
name = "a"

[[devices]]
kind = "endstop_none"
name = "b"
"#;
    let result = Composition::from_toml(toml);
    assert!(matches!(
        result,
        Err(Error::Config(ConfigError::ForwardReference { ref reference, .. })) if reference.as_str() == "a"
    ));
}

#[test]
fn test_from_toml_matches_new() {
    let table = printer_io::parse_table(BOARD_TOML).unwrap();
    let from_table = Composition::new(table).unwrap();
    let from_toml = composition();
    assert!(from_toml.declare().eq(from_table.declare()));

    let duplicate = r#"
[[devices]]
kind = "endstop_none"
name = "a"

[[devices]]
kind = "endstop_none"
name = "a"
"#;
    assert!(matches!(
        Composition::from_toml(duplicate),
        Err(Error::Config(ConfigError::DuplicateDevice(ref name))) if name.as_str() == "a"
    ));
}

#[test]
fn test_unknown_reference_is_rejected() {
    let toml = r#"
[[devices]]
kind = "pwm_software"
name = "fan"
output = "missing_pin"
"#;
    let result = Composition::from_toml(toml);
    assert!(matches!(
        result,
        Err(Error::Config(ConfigError::UnknownDevice { ref device, .. })) if device.as_str() == "fan"
    ));
}

#[test]
fn test_board_refusal_surfaces_as_board_error() {
    let composition = composition();
    let mut board = FakeBoard::new();
    board.refuse(54);
    let endstops = composition.define_endstops(&mut board).unwrap();

    let result = composition.define_machine(&mut board, &endstops);
    match result {
        Err(Error::Board(msg)) => assert!(msg.contains("54"), "message {}", msg),
        Err(other) => panic!("unexpected error {:?}", other),
        Ok(_) => panic!("refused pin accepted"),
    }
}
