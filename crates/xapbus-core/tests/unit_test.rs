#![allow(clippy::unwrap_used)]
// Unit and channel mirrors: device-authoritative reads and writes.

use pretty_assertions::assert_eq;
use secrecy::{ExposeSecret, SecretString};

use xapbus_api::{Link, Parameter, Target, Value};
use xapbus_core::{
    BusLetter, CoreError, DeviceModel, GainMode, SimUnit, SimulatedBus, UnitAddress,
    UnitController,
};

fn unit(n: u8) -> UnitAddress {
    UnitAddress::new(n).unwrap()
}

async fn discovered(sim: SimUnit) -> (SimulatedBus, UnitController) {
    let bus = SimulatedBus::new().with_unit(unit(3), sim);
    let controller = UnitController::discover(Link::new(bus.clone()), unit(3), DeviceModel::Xap800)
        .await
        .unwrap();
    (bus, controller)
}

// ── Staged initialization ───────────────────────────────────────────

#[tokio::test]
async fn test_new_does_no_io() {
    let bus = SimulatedBus::new().with_unit(unit(3), SimUnit::new("XAP800", "0x3"));
    let controller = UnitController::new(Link::new(bus.clone()), unit(3), DeviceModel::Xap800);

    assert_eq!(bus.exchange_count(unit(3)), 0);
    assert!(controller.settings().label.is_none());
    assert_eq!(controller.outputs().count(), 0);
}

#[tokio::test]
async fn test_populate_topology_leaves_mirrors_unfetched() {
    let bus = SimulatedBus::new().with_unit(unit(3), SimUnit::new("XAP800", "0x3"));
    let mut controller =
        UnitController::new(Link::new(bus.clone()), unit(3), DeviceModel::Xap800);

    controller.refresh().await.unwrap();
    let after_refresh = bus.exchange_count(unit(3));
    controller.populate_topology();

    assert_eq!(bus.exchange_count(unit(3)), after_refresh);
    assert_eq!(controller.outputs().count(), 12);
    assert!(controller.output(1).unwrap().state().label.is_none());
}

#[tokio::test]
async fn test_refresh_fetches_identity_and_settings() {
    let (_, controller) = discovered(
        SimUnit::new("XAP800", "0x0A2B3C4D")
            .with_version("3.0.1")
            .with_dsp_version("1.9"),
    )
    .await;

    let identity = controller.identity();
    assert_eq!(identity.serial_number.as_deref(), Some("0x0A2B3C4D"));
    assert_eq!(identity.firmware_version.as_deref(), Some("3.0.1"));
    assert_eq!(identity.dsp_version.as_deref(), Some("1.9"));

    let settings = controller.settings();
    assert_eq!(settings.label.as_deref(), Some("XAP800"));
    assert_eq!(settings.modem_init_string.as_deref(), Some("ATZ"));
    assert_eq!(settings.panel_timeout_minutes, Some(5));
    assert_eq!(settings.safety_mute, Some(false));
    assert!(settings.modem_password.is_some());
}

#[tokio::test]
async fn test_refresh_is_idempotent() {
    let (_, mut controller) = discovered(SimUnit::new("XAP800", "0x3")).await;
    let before = serde_json::to_value(controller.snapshot()).unwrap();

    controller.refresh().await.unwrap();
    controller.refresh_channels().await.unwrap();

    assert_eq!(serde_json::to_value(controller.snapshot()).unwrap(), before);
}

// ── Device authority ────────────────────────────────────────────────

#[tokio::test]
async fn test_label_mirror_holds_truncated_value() {
    let (_, mut controller) = discovered(SimUnit::new("XAP800", "0x3").with_label_limit(8)).await;

    let confirmed = controller.set_label("Boardroom East").await.unwrap();

    assert_eq!(confirmed, "Boardroo");
    assert_eq!(controller.settings().label.as_deref(), Some("Boardroo"));
}

#[tokio::test]
async fn test_label_within_limit_round_trips() {
    let (_, mut controller) = discovered(SimUnit::new("XAP800", "0x3").with_label_limit(20)).await;

    assert_eq!(controller.set_label("Main Hall").await.unwrap(), "Main Hall");
    assert_eq!(controller.get_label().await.unwrap(), "Main Hall");
    assert_eq!(controller.settings().label.as_deref(), Some("Main Hall"));

    let output = controller.output_mut(2).unwrap();
    assert_eq!(output.set_label("Stage Left").await.unwrap(), "Stage Left");
    assert_eq!(output.get_label().await.unwrap(), "Stage Left");
    assert_eq!(output.label(), Some("Stage Left"));
}

#[tokio::test]
async fn test_channel_label_over_limit_reads_back_truncated() {
    let (bus, mut controller) = discovered(SimUnit::new("XAP800", "0x3").with_label_limit(6)).await;
    let input = controller.input_mut(9).unwrap();

    assert_eq!(input.set_label("Podium Line").await.unwrap(), "Podium");
    assert_eq!(input.get_label().await.unwrap(), "Podium");
    assert_eq!(input.label(), Some("Podium"));
    assert_eq!(
        bus.device_value(unit(3), Parameter::Label, Target::input(9)),
        Some(Value::Text("Podium".into()))
    );
}

#[tokio::test]
async fn test_gain_mirror_holds_clamped_value() {
    let (_, mut controller) = discovered(SimUnit::new("XAP800", "0x3")).await;
    let output = controller.output_mut(1).unwrap();

    let applied = output.set_gain(40.0, GainMode::Absolute).await.unwrap();

    assert!((applied - 12.0).abs() < f64::EPSILON);
    assert_eq!(output.state().gain, Some(applied));
}

#[tokio::test]
async fn test_get_picks_up_front_panel_changes() {
    let (bus, mut controller) = discovered(SimUnit::new("XAP800", "0x3")).await;
    bus.set_device_value(unit(3), Parameter::Mute, Target::input(6), Value::Flag(true));

    let input = controller.input_mut(6).unwrap();
    assert_eq!(input.state().muted, Some(false));
    assert!(input.get_mute().await.unwrap());
    assert_eq!(input.state().muted, Some(true));
}

#[tokio::test]
async fn test_settings_round_trip_through_device() {
    let (bus, mut controller) = discovered(SimUnit::new("XAP800", "0x3")).await;

    assert!(controller.set_safety_mute(true).await.unwrap());
    assert_eq!(controller.set_panel_timeout(15).await.unwrap(), 15);
    assert!(controller.set_panel_lock(true).await.unwrap());
    assert!(controller.set_modem_mode(true).await.unwrap());
    assert_eq!(controller.set_modem_init("AT&F").await.unwrap(), "AT&F");

    assert_eq!(
        bus.device_value(unit(3), Parameter::PanelTimeout, Target::Unit),
        Some(Value::Integer(15))
    );
    let settings = controller.settings();
    assert_eq!(settings.safety_mute, Some(true));
    assert_eq!(settings.panel_lockout, Some(true));
    assert_eq!(settings.modem_mode, Some(true));
}

#[tokio::test]
async fn test_modem_password_stays_secret() {
    let (_, mut controller) = discovered(SimUnit::new("XAP800", "0x3")).await;

    let confirmed = controller
        .set_modem_password(&SecretString::from(String::from("s3cret")))
        .await
        .unwrap();

    assert_eq!(confirmed.expose_secret(), "s3cret");
    let json = serde_json::to_string(&controller.snapshot()).unwrap();
    assert!(!json.contains("s3cret"));
}

#[tokio::test]
async fn test_proportional_gain_is_device_computed() {
    let (_, mut controller) = discovered(SimUnit::new("XAP800", "0x3")).await;
    let output = controller.output_mut(2).unwrap();

    output.set_max_gain(10.0).await.unwrap();
    output.set_min_gain(-10.0).await.unwrap();
    output.set_gain(0.0, GainMode::Absolute).await.unwrap();

    let fraction = output.get_proportional_gain().await.unwrap();
    assert!((fraction - 0.5).abs() < 1e-9);
}

// ── Expansion bus ───────────────────────────────────────────────────

#[tokio::test]
async fn test_expansion_labels_are_independent() {
    let (_, mut controller) = discovered(SimUnit::new("XAP800", "0x3")).await;
    let letter = BusLetter::new('R').unwrap();
    let channel = controller.expansion_channel_mut(letter).unwrap();

    channel.set_input_label("From lobby").await.unwrap();
    channel.set_output_label("To lobby").await.unwrap();
    channel.refresh().await.unwrap();

    assert_eq!(channel.labels().input_label.as_deref(), Some("From lobby"));
    assert_eq!(channel.labels().output_label.as_deref(), Some("To lobby"));
}

#[tokio::test]
async fn test_allocation_marks_channel_in_use() {
    let (_, mut controller) = discovered(SimUnit::new("XAP800", "0x3")).await;
    let o = BusLetter::new('O').unwrap();

    controller
        .reserve_expansion_channel(BusLetter::new('P').unwrap())
        .unwrap();
    let first = controller.request_expansion_channel().unwrap();
    let second = controller.request_expansion_channel().unwrap();

    assert_eq!(first, o);
    assert_eq!(second, BusLetter::new('Q').unwrap());
    assert!(controller.expansion_channel(o).unwrap().in_use());

    controller.release_expansion_channel(o).unwrap();
    assert!(!controller.expansion_channel(o).unwrap().in_use());
}

#[tokio::test]
async fn test_allocation_exhausts_after_twelve() {
    let (_, mut controller) = discovered(SimUnit::new("XAP800", "0x3")).await;

    for _ in 0..12 {
        controller.request_expansion_channel().unwrap();
    }

    assert!(matches!(
        controller.request_expansion_channel(),
        Err(CoreError::ExpansionExhausted { unit: 3 })
    ));
}

#[tokio::test]
async fn test_display() {
    let (_, controller) = discovered(SimUnit::new("XAP800", "0x3")).await;
    assert_eq!(controller.to_string(), "Unit: XAP800 (ID 3)");
}
