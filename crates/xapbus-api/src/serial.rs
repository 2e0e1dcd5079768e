// XAP ASCII command framing over a byte stream.
//
// Requests are single CR-terminated lines:
//
//     #<type><unit> <MNEMONIC> [address args...] [value [A|R]]
//
// The unit echoes the header, mnemonic and address arguments followed by
// the (confirmed) value. Any stream works; `open` wires up a real port.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::time::{Instant, timeout_at};
use tokio_serial::{DataBits, FlowControl, Parity, SerialPortBuilderExt, SerialStream, StopBits};
use tracing::{debug, trace};

use crate::error::Error;
use crate::protocol::{Action, Parameter, Request, Target, UnitAddress, Value};
use crate::transport::Transport;

const LINE_END: u8 = b'\r';

/// Model names by the type code carried in a reply header.
const TYPE_CODES: &[(char, &str)] = &[('5', "XAP800"), ('4', "XAP400")];

pub struct SerialTransport<S> {
    stream: BufReader<S>,
    device_code: char,
    timeout: Duration,
    port: String,
}

impl SerialTransport<SerialStream> {
    /// Open a serial port at 8N1, no flow control.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn open(
        path: &str,
        baud_rate: u32,
        device_code: char,
        timeout: Duration,
    ) -> Result<Self, Error> {
        let stream = tokio_serial::new(path, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .open_native_async()
            .map_err(|e| Error::Serial {
                path: path.to_owned(),
                reason: e.description,
            })?;
        debug!(path, baud_rate, "serial port open");
        Ok(Self::new(stream, device_code, timeout).with_port_name(path))
    }
}

impl<S> SerialTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(stream: S, device_code: char, timeout: Duration) -> Self {
        Self {
            stream: BufReader::new(stream),
            device_code,
            timeout,
            port: "<stream>".into(),
        }
    }

    pub fn with_port_name(mut self, port: &str) -> Self {
        port.clone_into(&mut self.port);
        self
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    /// Read lines until the reply for `expect` arrives or the deadline passes.
    ///
    /// A line identical to the request is the port echoing it. For a query
    /// it is held back and only returned if nothing else answers, since a
    /// unit reporting an empty value sends the same bytes.
    async fn read_reply(
        &mut self,
        unit: UnitAddress,
        expect: &Expected<'_>,
    ) -> Result<Option<(char, String)>, Error> {
        let deadline = Instant::now() + self.timeout;
        let mut buf = Vec::new();
        let mut held = None;

        loop {
            buf.clear();
            let read = match timeout_at(deadline, self.stream.read_until(LINE_END, &mut buf)).await
            {
                Err(_) => return Ok(held),
                Ok(read) => read?,
            };
            if read == 0 {
                return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into());
            }

            let line = String::from_utf8_lossy(&buf);
            let line = line.trim();
            trace!(port = %self.port, line, "rx");
            if line.is_empty() {
                continue;
            }

            if let Some(message) = line.strip_prefix("ERROR") {
                return Err(Error::Rejected {
                    unit,
                    message: message.trim().to_owned(),
                });
            }

            let echoed = line == expect.sent;
            if echoed && expect.action == EchoHandling::Skip {
                trace!(line, "skipping echo");
                continue;
            }

            let Some(reply) = parse_reply(line, expect.args.len())? else {
                continue;
            };
            if !expect.matches(unit, &reply) {
                trace!(line, "skipping reply for another exchange");
                continue;
            }
            let answer = (reply.type_code, reply.value.to_owned());
            if echoed && expect.action == EchoHandling::Hold && held.is_none() {
                held = Some(answer);
                continue;
            }
            return Ok(Some(answer));
        }
    }
}

/// What a reply must carry to answer the request just sent.
struct Expected<'a> {
    sent: &'a str,
    mnemonic: &'a str,
    args: Vec<String>,
    action: EchoHandling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EchoHandling {
    /// Queries: an echo looks like an empty answer.
    Hold,
    /// Relative changes: the answer is always absolute, never the echo.
    Skip,
    /// Writes: the confirmed value may repeat the request exactly.
    Accept,
}

impl Expected<'_> {
    fn matches(&self, unit: UnitAddress, reply: &Reply<'_>) -> bool {
        reply.unit == unit.wire_digit()
            && reply.mnemonic == self.mnemonic
            && reply.args.len() == self.args.len()
            && reply
                .args
                .iter()
                .zip(&self.args)
                .all(|(got, want)| got.eq_ignore_ascii_case(want))
    }
}

#[async_trait]
impl<S> Transport for SerialTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn exchange(
        &mut self,
        unit: UnitAddress,
        request: &Request,
    ) -> Result<Option<Value>, Error> {
        // Drop anything a slow unit delivered after an earlier timeout.
        let stale = self.stream.buffer().len();
        self.stream.consume(stale);

        let line = encode_request(self.device_code, unit, request);
        trace!(port = %self.port, line = line.trim_end(), "tx");
        let writer = self.stream.get_mut();
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await?;

        let mnemonic = wire_mnemonic(request.parameter);
        let expect = Expected {
            sent: line.trim(),
            mnemonic,
            args: address_args(request.parameter, &request.target),
            action: match request.action {
                Action::Get => EchoHandling::Hold,
                Action::Adjust(_) => EchoHandling::Skip,
                Action::Set(_) => EchoHandling::Accept,
            },
        };
        let Some((type_code, raw)) = self.read_reply(unit, &expect).await? else {
            debug!(%unit, mnemonic, "no reply");
            return Ok(None);
        };

        if request.parameter == Parameter::UnitType {
            return Ok(Some(Value::Text(model_name(type_code))));
        }

        let kind = request.parameter.kind();
        Value::parse(kind, &raw)
            .map(Some)
            .ok_or_else(|| Error::Malformed {
                line: raw,
                reason: format!("expected {} value for {mnemonic}", kind.name()),
            })
    }

    fn response_timeout(&self) -> Duration {
        self.timeout
    }

    fn set_response_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }
}

// ── Framing helpers ──────────────────────────────────────────────

/// Unit type has no mnemonic of its own; it rides on the `VER` header.
fn wire_mnemonic(parameter: Parameter) -> &'static str {
    match parameter {
        Parameter::UnitType => Parameter::Version.mnemonic(),
        other => other.mnemonic(),
    }
}

fn address_args(parameter: Parameter, target: &Target) -> Vec<String> {
    match target {
        Target::Unit if parameter == Parameter::Label => vec!["0".into(), "U".into()],
        Target::Unit => Vec::new(),
        Target::Channel { number, group } => vec![number.to_string(), group.code().to_string()],
        Target::Expansion { bus, direction } => vec![
            bus.to_string(),
            "E".into(),
            direction.flag().to_string(),
        ],
    }
}

/// Build one CR-terminated request line.
pub fn encode_request(device_code: char, unit: UnitAddress, request: &Request) -> String {
    let mut line = format!(
        "#{device_code}{} {}",
        unit.wire_digit(),
        wire_mnemonic(request.parameter)
    );
    for arg in address_args(request.parameter, &request.target) {
        line.push(' ');
        line.push_str(&arg);
    }
    match &request.action {
        Action::Get => {}
        Action::Set(value) => {
            line.push(' ');
            line.push_str(&value.to_wire_with(request.parameter.wire_decimals()));
            if request.parameter == Parameter::Gain {
                line.push_str(" A");
            }
        }
        Action::Adjust(delta) => {
            line.push_str(&format!(" {delta:.2} R"));
        }
    }
    line.push(char::from(LINE_END));
    line
}

struct Reply<'a> {
    type_code: char,
    unit: char,
    mnemonic: &'a str,
    args: Vec<&'a str>,
    value: &'a str,
}

/// Split a reply into header, mnemonic, address arguments and value. Lines that are not
/// replies at all (no `#` header) yield `Ok(None)`.
fn parse_reply(line: &str, arg_count: usize) -> Result<Option<Reply<'_>>, Error> {
    if !line.starts_with('#') {
        return Ok(None);
    }
    let malformed = |reason: &str| Error::Malformed {
        line: line.to_owned(),
        reason: reason.to_owned(),
    };

    let (tokens, value) = take_tokens(line, 2 + arg_count).ok_or_else(|| malformed("truncated"))?;
    let [head, mnemonic, args @ ..] = tokens.as_slice() else {
        return Err(malformed("truncated"));
    };
    let mut header = head.chars().skip(1);
    let (Some(type_code), Some(unit), None) = (header.next(), header.next(), header.next()) else {
        return Err(malformed("bad header"));
    };

    Ok(Some(Reply {
        type_code,
        unit,
        mnemonic: *mnemonic,
        args: args.to_vec(),
        value,
    }))
}

fn take_tokens(line: &str, count: usize) -> Option<(Vec<&str>, &str)> {
    let mut rest = line;
    let mut tokens = Vec::with_capacity(count);
    for _ in 0..count {
        rest = rest.trim_start();
        if rest.is_empty() {
            return None;
        }
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        tokens.push(&rest[..end]);
        rest = &rest[end..];
    }
    Some((tokens, rest.trim()))
}

fn model_name(type_code: char) -> String {
    TYPE_CODES
        .iter()
        .find(|(code, _)| *code == type_code)
        .map_or_else(|| format!("type-{type_code}"), |(_, name)| (*name).to_owned())
}
