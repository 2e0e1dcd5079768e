// Shared bus handle.
//
// A `Transport` answers one request at a time. `Link` wraps it in an
// async mutex so that every clone (one per unit, channel and expansion
// slot) funnels through the same question/answer boundary. One exchange
// holds the lock for its whole duration; exchanges never interleave.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, trace};

use crate::error::Error;
use crate::protocol::{Parameter, Request, Target, UnitAddress, Value, WireValue};

/// A request/response command channel to every unit on one bus.
///
/// `Ok(None)` means the addressed unit did not answer within
/// [`response_timeout`](Transport::response_timeout). Framing, checksums
/// and byte-level retries belong to the implementation.
#[async_trait]
pub trait Transport: Send {
    async fn exchange(
        &mut self,
        unit: UnitAddress,
        request: &Request,
    ) -> Result<Option<Value>, Error>;

    /// Maximum time to wait for a reply.
    fn response_timeout(&self) -> Duration;

    fn set_response_timeout(&mut self, timeout: Duration);
}

/// Cheaply cloneable handle to the bus transport.
#[derive(Clone)]
pub struct Link {
    inner: Arc<Mutex<Box<dyn Transport>>>,
}

impl std::fmt::Debug for Link {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Link").finish_non_exhaustive()
    }
}

impl Link {
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self::from_boxed(Box::new(transport))
    }

    pub fn from_boxed(transport: Box<dyn Transport>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(transport)),
        }
    }

    pub async fn response_timeout(&self) -> Duration {
        self.inner.lock().await.response_timeout()
    }

    pub async fn set_response_timeout(&self, timeout: Duration) {
        self.inner.lock().await.set_response_timeout(timeout);
    }

    /// Run one exchange under the lock.
    pub async fn exchange(
        &self,
        unit: UnitAddress,
        request: &Request,
    ) -> Result<Option<Value>, Error> {
        let mut transport = self.inner.lock().await;
        trace!(%unit, ?request, "exchange");
        transport.exchange(unit, request).await
    }

    // ── Typed accessors ──────────────────────────────────────────

    /// Presence probe. `None` is the only absence signal.
    pub async fn probe_unique_id(&self, unit: UnitAddress) -> Result<Option<String>, Error> {
        let request = Request::get(Parameter::UniqueId, Target::Unit);
        match self.exchange(unit, &request).await? {
            Some(value) => convert(Parameter::UniqueId, value).map(Some),
            None => Ok(None),
        }
    }

    /// Fetch a value that a unit may legitimately leave unanswered.
    pub async fn get_optional<T: WireValue>(
        &self,
        unit: UnitAddress,
        parameter: Parameter,
        target: Target,
    ) -> Result<Option<T>, Error> {
        let request = Request::get(parameter, target);
        match self.exchange(unit, &request).await? {
            Some(value) => convert(parameter, value).map(Some),
            None => Ok(None),
        }
    }

    /// Fetch the current value of `parameter`.
    pub async fn get<T: WireValue>(
        &self,
        unit: UnitAddress,
        parameter: Parameter,
        target: Target,
    ) -> Result<T, Error> {
        let request = Request::get(parameter, target);
        let value = self.answered(unit, &request).await?;
        debug!(%unit, %parameter, ?target, %value, "fetched");
        convert(parameter, value)
    }

    /// Write `value` and return what the unit confirmed.
    pub async fn set<T: WireValue>(
        &self,
        unit: UnitAddress,
        parameter: Parameter,
        target: Target,
        value: T,
    ) -> Result<T, Error> {
        let request = Request::set(parameter, target, value.into_value());
        let confirmed = self.answered(unit, &request).await?;
        debug!(%unit, %parameter, ?target, %confirmed, "confirmed");
        convert(parameter, confirmed)
    }

    /// Offset a numeric value and return the resulting absolute value.
    pub async fn adjust(
        &self,
        unit: UnitAddress,
        parameter: Parameter,
        target: Target,
        delta: f64,
    ) -> Result<f64, Error> {
        let request = Request::adjust(parameter, target, delta);
        let confirmed = self.answered(unit, &request).await?;
        debug!(%unit, %parameter, ?target, delta, %confirmed, "adjusted");
        convert(parameter, confirmed)
    }

    async fn answered(&self, unit: UnitAddress, request: &Request) -> Result<Value, Error> {
        self.exchange(unit, request)
            .await?
            .ok_or(Error::NoResponse {
                unit,
                command: request.parameter.mnemonic(),
            })
    }
}

fn convert<T: WireValue>(parameter: Parameter, value: Value) -> Result<T, Error> {
    T::from_value(value).map_err(|other| Error::UnexpectedValue {
        parameter,
        expected: T::KIND.name(),
        got: format!("{other:?}"),
    })
}
