#![allow(clippy::unwrap_used)]
// Integration tests for `SerialTransport` over an in-memory duplex stream.
//
// Replies are queued on the device end before the exchange runs, then the
// request line the transport wrote is read back and checked.

use std::time::Duration;

use pretty_assertions::assert_eq;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};

use xapbus_api::{
    BusDirection, BusLetter, Error, Parameter, Request, SerialTransport, Target, Transport,
    UnitAddress, Value,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn setup() -> (SerialTransport<DuplexStream>, BufReader<DuplexStream>) {
    let (host, device) = tokio::io::duplex(1024);
    let transport = SerialTransport::new(host, '5', Duration::from_millis(50));
    (transport, BufReader::new(device))
}

fn unit(n: u8) -> UnitAddress {
    UnitAddress::new(n).unwrap()
}

async fn queue_reply(device: &mut BufReader<DuplexStream>, line: &str) {
    device.get_mut().write_all(line.as_bytes()).await.unwrap();
}

async fn sent_line(device: &mut BufReader<DuplexStream>) -> String {
    let mut buf = Vec::new();
    device.read_until(b'\r', &mut buf).await.unwrap();
    String::from_utf8(buf).unwrap()
}

// ── Queries ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_get_channel_label() {
    let (mut transport, mut device) = setup();
    queue_reply(&mut device, "#52 LABEL 3 I Lectern Mic\r\n").await;

    let req = Request::get(Parameter::Label, Target::input(3));
    let value = transport.exchange(unit(2), &req).await.unwrap();

    assert_eq!(value, Some(Value::Text("Lectern Mic".into())));
    assert_eq!(sent_line(&mut device).await, "#52 LABEL 3 I\r");
}

#[tokio::test]
async fn test_set_gain_returns_device_value() {
    let (mut transport, mut device) = setup();
    // The unit clamps to its own maximum and echoes what it applied.
    queue_reply(&mut device, "#50 GAIN 1 O 12.00 A\r\n").await;

    let req = Request::set(Parameter::Gain, Target::output(1), Value::Number(30.0));
    let value = transport.exchange(unit(0), &req).await.unwrap();

    assert_eq!(value, Some(Value::Number(12.0)));
    assert_eq!(sent_line(&mut device).await, "#50 GAIN 1 O 30.00 A\r");
}

#[tokio::test]
async fn test_flag_round_trip() {
    let (mut transport, mut device) = setup();
    queue_reply(&mut device, "#51 SFTYMUTE 1\r\n").await;

    let req = Request::set(Parameter::SafetyMute, Target::Unit, Value::Flag(true));
    let value = transport.exchange(unit(1), &req).await.unwrap();

    assert_eq!(value, Some(Value::Flag(true)));
    assert_eq!(sent_line(&mut device).await, "#51 SFTYMUTE 1\r");
}

#[tokio::test]
async fn test_unit_type_from_reply_header() {
    let (mut transport, mut device) = setup();
    queue_reply(&mut device, "#42 VER 3.1.0\r\n").await;

    let req = Request::get(Parameter::UnitType, Target::Unit);
    let value = transport.exchange(unit(2), &req).await.unwrap();

    assert_eq!(value, Some(Value::Text("XAP400".into())));
}

#[tokio::test]
async fn test_skips_noise_and_other_units() {
    let (mut transport, mut device) = setup();
    queue_reply(&mut device, "\r\n#53 UID 0x1111\r\nOK\r\n#52 UID 0xBEEF\r\n").await;

    let req = Request::get(Parameter::UniqueId, Target::Unit);
    let value = transport.exchange(unit(2), &req).await.unwrap();

    assert_eq!(value, Some(Value::Text("0xBEEF".into())));
}

#[tokio::test]
async fn test_reply_for_another_channel_is_not_accepted() {
    let (mut transport, mut device) = setup();
    // A late answer about output 3 arrives ahead of the one for output 4.
    queue_reply(&mut device, "#52 GAIN 3 O -20.00 A\r\n#52 GAIN 4 O -3.00 A\r\n").await;

    let req = Request::get(Parameter::Gain, Target::output(4));
    let value = transport.exchange(unit(2), &req).await.unwrap();

    assert_eq!(value, Some(Value::Number(-3.0)));
}

#[tokio::test]
async fn test_expansion_label_direction_must_match() {
    let (mut transport, mut device) = setup();
    queue_reply(
        &mut device,
        "#52 LABEL Q E 1 Lobby In\r\n#52 LABEL q E 0 Lobby Out\r\n",
    )
    .await;

    let target = Target::Expansion {
        bus: BusLetter::new('Q').unwrap(),
        direction: BusDirection::Out,
    };
    let req = Request::get(Parameter::Label, target);
    let value = transport.exchange(unit(2), &req).await.unwrap();

    assert_eq!(value, Some(Value::Text("Lobby Out".into())));
}

#[tokio::test(start_paused = true)]
async fn test_only_other_targets_answering_is_none() {
    let (mut transport, mut device) = setup();
    queue_reply(&mut device, "#52 MUTE 3 I 1\r\n").await;

    let req = Request::get(Parameter::Mute, Target::input(4));
    let value = transport.exchange(unit(2), &req).await.unwrap();

    assert!(value.is_none());
}

// ── Echoes ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_echoed_query_is_skipped() {
    let (mut transport, mut device) = setup();
    queue_reply(&mut device, "#52 MUTE 1 O\r#52 MUTE 1 O 1\r").await;

    let req = Request::get(Parameter::Mute, Target::output(1));
    let value = transport.exchange(unit(2), &req).await.unwrap();

    assert_eq!(value, Some(Value::Flag(true)));
}

#[tokio::test(start_paused = true)]
async fn test_lone_echo_reads_as_empty_text() {
    let (mut transport, mut device) = setup();
    queue_reply(&mut device, "#53 UID\r").await;

    let req = Request::get(Parameter::UniqueId, Target::Unit);
    let value = transport.exchange(unit(3), &req).await.unwrap();

    assert_eq!(value, Some(Value::Text(String::new())));
}

#[tokio::test]
async fn test_echoed_relative_gain_is_skipped() {
    let (mut transport, mut device) = setup();
    queue_reply(&mut device, "#52 GAIN 1 I 2.50 R\r\n#52 GAIN 1 I 4.50 A\r\n").await;

    let req = Request::adjust(Parameter::Gain, Target::input(1), 2.5);
    let value = transport.exchange(unit(2), &req).await.unwrap();

    assert_eq!(value, Some(Value::Number(4.5)));
}

#[tokio::test]
async fn test_proportional_gain_sent_with_four_decimals() {
    let (mut transport, mut device) = setup();
    queue_reply(&mut device, "#52 PGAIN 2 O 0.1250\r\n").await;

    let req = Request::set(
        Parameter::ProportionalGain,
        Target::output(2),
        Value::Number(0.125),
    );
    let value = transport.exchange(unit(2), &req).await.unwrap();

    assert_eq!(value, Some(Value::Number(0.125)));
    assert_eq!(sent_line(&mut device).await, "#52 PGAIN 2 O 0.1250\r");
}

// ── Failure modes ───────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_silence_is_none() {
    let (mut transport, mut device) = setup();

    let req = Request::get(Parameter::UniqueId, Target::Unit);
    let value = transport.exchange(unit(6), &req).await.unwrap();

    assert!(value.is_none());
    assert_eq!(sent_line(&mut device).await, "#56 UID\r");
}

#[tokio::test]
async fn test_error_line_is_rejected() {
    let (mut transport, mut device) = setup();
    queue_reply(&mut device, "ERROR invalid channel\r\n").await;

    let req = Request::get(Parameter::Mute, Target::output(99));
    let result = transport.exchange(unit(0), &req).await;

    assert!(
        matches!(result, Err(Error::Rejected { ref message, .. }) if message == "invalid channel"),
        "expected Rejected, got: {result:?}"
    );
}

#[tokio::test]
async fn test_unparseable_value_is_malformed() {
    let (mut transport, mut device) = setup();
    queue_reply(&mut device, "#50 MAX 1 O loud\r\n").await;

    let req = Request::get(Parameter::MaxGain, Target::output(1));
    let result = transport.exchange(unit(0), &req).await;

    assert!(
        matches!(result, Err(Error::Malformed { .. })),
        "expected Malformed, got: {result:?}"
    );
}

#[tokio::test]
async fn test_closed_stream_is_io_error() {
    let (host, device) = tokio::io::duplex(64);
    drop(device);
    let mut transport = SerialTransport::new(host, '5', Duration::from_millis(50));

    let req = Request::get(Parameter::UniqueId, Target::Unit);
    let result = transport.exchange(unit(0), &req).await;

    assert!(matches!(result, Err(Error::Io(_))), "got: {result:?}");
}

#[test]
fn test_response_timeout_is_adjustable() {
    let (host, _device) = tokio::io::duplex(64);
    let mut transport = SerialTransport::new(host, '5', Duration::from_millis(500));
    transport.set_response_timeout(Duration::from_millis(100));
    assert_eq!(transport.response_timeout(), Duration::from_millis(100));
}
