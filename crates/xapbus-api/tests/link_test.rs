#![allow(clippy::unwrap_used)]
// Typed `Link` accessors against the simulated bus.

use std::time::Duration;

use pretty_assertions::assert_eq;

use xapbus_api::{Error, Link, Parameter, SimUnit, SimulatedBus, Target, UnitAddress};

fn unit(n: u8) -> UnitAddress {
    UnitAddress::new(n).unwrap()
}

fn setup() -> (SimulatedBus, Link) {
    let bus = SimulatedBus::new().with_unit(unit(4), SimUnit::new("XAP800", "0xC0FFEE"));
    (bus.clone(), Link::new(bus))
}

#[tokio::test]
async fn test_probe_reports_presence_and_absence() {
    let (_, link) = setup();

    assert_eq!(
        link.probe_unique_id(unit(4)).await.unwrap().as_deref(),
        Some("0xC0FFEE")
    );
    assert!(link.probe_unique_id(unit(3)).await.unwrap().is_none());
}

#[tokio::test]
async fn test_get_on_absent_unit_is_no_response() {
    let (_, link) = setup();

    let result = link
        .get::<String>(unit(1), Parameter::Label, Target::Unit)
        .await;

    assert!(
        matches!(result, Err(Error::NoResponse { command: "LABEL", .. })),
        "got: {result:?}"
    );
}

#[tokio::test]
async fn test_set_returns_confirmed_value() {
    let (bus, link) = setup();

    let confirmed = link
        .set(unit(4), Parameter::MaxGain, Target::output(2), 6.0)
        .await
        .unwrap();

    assert!((confirmed - 6.0).abs() < f64::EPSILON);
    assert_eq!(bus.exchange_count(unit(4)), 1);
}

#[tokio::test]
async fn test_wrong_kind_is_unexpected_value() {
    let (_, link) = setup();

    let result = link.get::<bool>(unit(4), Parameter::Label, Target::Unit).await;

    assert!(
        matches!(result, Err(Error::UnexpectedValue { expected: "flag", .. })),
        "got: {result:?}"
    );
}

#[tokio::test]
async fn test_adjust_is_relative_to_device_state() {
    let (_, link) = setup();
    let target = Target::input(1);

    link.set(unit(4), Parameter::Gain, target, -10.0).await.unwrap();
    let after = link
        .adjust(unit(4), Parameter::Gain, target, 3.0)
        .await
        .unwrap();

    assert!((after - -7.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_response_timeout_passes_through() {
    let (bus, link) = setup();

    link.set_response_timeout(Duration::from_millis(80)).await;

    assert_eq!(link.response_timeout().await, Duration::from_millis(80));
    assert_eq!(bus.current_timeout(), Duration::from_millis(80));
}

#[tokio::test]
async fn test_optional_get_tolerates_silence() {
    let bus = SimulatedBus::new().with_unit(unit(0), SimUnit::new("XAP800", "x").without_unit_type());
    let link = Link::new(bus);

    let reported: Option<String> = link
        .get_optional(unit(0), Parameter::UnitType, Target::Unit)
        .await
        .unwrap();

    assert!(reported.is_none());
}
