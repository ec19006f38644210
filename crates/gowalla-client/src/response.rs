//! Lazily evaluated API responses
//!
//! A [`LazyResponse`] wraps one HTTP exchange that may still be in flight.
//! Nothing is parsed or classified until the response is first inspected;
//! at that point it moves through a small state machine:
//!
//! ```text
//! Pending ──first access──▶ Materializing ──▶ Ready   (status in [200, 400), body parsed)
//!                                        └──▶ Failed  (error status, transport error,
//!                                                      or unparseable body)
//! ```
//!
//! The transition happens once, under an async mutex, so concurrent callers
//! wait on the same materialization. A `Failed` response hands out the same
//! error on every field access, while its status, headers and raw text stay
//! readable.
//!
//! ## Disposal
//!
//! Dropping a response that was never inspected does not abandon the request.
//! A background request is handed to a drain task on the client's tracker,
//! which waits for it and logs a warning if it failed. A completed failure
//! that nobody looked at is logged on drop. `LazyResponse::finish` is the
//! explicit way to wait and surface the outcome.

use std::{
    fmt,
    sync::atomic::{AtomicU8, Ordering},
};

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tokio::{
    sync::{Mutex, MutexGuard},
    task::JoinHandle,
};
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

use crate::{
    error::{classify, GowallaError, TransportError},
    transport::{HttpMethod, HttpRequest, RawHttpResult},
};

pub(crate) type TransportResult = Result<RawHttpResult, TransportError>;

// ============================================================================
// Public helper types
// ============================================================================

/// Observable lifecycle phase of a [`LazyResponse`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Not inspected yet; the request may still be running
    Pending,
    /// First access is waiting for the request and parsing the body
    Materializing,
    /// Success status, body parsed
    Ready,
    /// Error status, transport failure, or invalid body
    Failed,
}

impl Phase {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Phase::Pending,
            1 => Phase::Materializing,
            2 => Phase::Ready,
            _ => Phase::Failed,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Phase::Pending => 0,
            Phase::Materializing => 1,
            Phase::Ready => 2,
            Phase::Failed => 3,
        }
    }
}

/// A key into the top-level JSON value: an object field or an array index
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Name(String),
    Index(usize),
}

impl Key {
    fn as_index(&self) -> Option<usize> {
        match self {
            Key::Index(index) => Some(*index),
            Key::Name(name) => name.parse().ok(),
        }
    }

    fn as_name(&self) -> String {
        match self {
            Key::Name(name) => name.clone(),
            Key::Index(index) => index.to_string(),
        }
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Key::Name(name.to_string())
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Key::Name(name)
    }
}

impl From<usize> for Key {
    fn from(index: usize) -> Self {
        Key::Index(index)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Name(name) => write!(f, "\"{name}\""),
            Key::Index(index) => write!(f, "[{index}]"),
        }
    }
}

/// One top-level element of a parsed body
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    /// A key/value pair of a JSON object
    Field(String, Value),
    /// An element of a JSON array (or a lone scalar body)
    Item(Value),
}

impl Entry {
    pub fn name(&self) -> Option<&str> {
        match self {
            Entry::Field(name, _) => Some(name),
            Entry::Item(_) => None,
        }
    }

    pub fn value(&self) -> &Value {
        match self {
            Entry::Field(_, value) | Entry::Item(value) => value,
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            Entry::Field(_, value) | Entry::Item(value) => value,
        }
    }
}

/// Owned iterator over a snapshot of the top-level entries
pub type Entries = std::vec::IntoIter<Entry>;

// ============================================================================
// Internal state
// ============================================================================

/// Method and query-less URL of the request, for log lines
#[derive(Debug, Clone)]
pub(crate) struct RequestLabel {
    method: Option<HttpMethod>,
    url: String,
}

impl RequestLabel {
    pub(crate) fn for_request(request: &HttpRequest) -> Self {
        Self {
            method: Some(request.method),
            url: request.redacted_url().to_string(),
        }
    }

    fn simulated() -> Self {
        Self {
            method: None,
            url: "<simulated>".to_string(),
        }
    }
}

impl fmt::Display for RequestLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.method {
            Some(method) => write!(f, "{method} {}", self.url),
            None => f.write_str(&self.url),
        }
    }
}

/// The underlying exchange, before it has been observed
enum Operation {
    /// Running on the client's tracker (background dispatch)
    Spawned {
        handle: JoinHandle<TransportResult>,
        tracker: TaskTracker,
    },
    /// Already completed (blocking dispatch); `None` once taken
    Finished(Option<TransportResult>),
}

impl Operation {
    /// Waits for the exchange. Cancel-safe: the join handle stays in place
    /// until the caller replaces the operation.
    async fn wait(&mut self) -> TransportResult {
        match self {
            Operation::Spawned { handle, .. } => match handle.await {
                Ok(result) => result,
                Err(join_err) => Err(TransportError::from(join_err)),
            },
            Operation::Finished(result) => result
                .take()
                .unwrap_or_else(|| Err(TransportError::Aborted("result already taken".into()))),
        }
    }

    fn take_spawned(&mut self) -> Option<(JoinHandle<TransportResult>, TaskTracker)> {
        match std::mem::replace(self, Operation::Finished(None)) {
            Operation::Spawned { handle, tracker } => Some((handle, tracker)),
            other => {
                *self = other;
                None
            }
        }
    }
}

struct Failure {
    raw: Option<RawHttpResult>,
    error: GowallaError,
}

enum State {
    Pending(Operation),
    Ready { raw: RawHttpResult, body: Value },
    Failed(Failure),
}

impl State {
    fn settle(label: &RequestLabel, outcome: TransportResult) -> Self {
        let raw = match outcome {
            Ok(raw) => raw,
            Err(err) => {
                debug!(request = %label, error = %err, "Request failed at transport level");
                return State::Failed(Failure {
                    raw: None,
                    error: err.into(),
                });
            }
        };

        if !raw.is_success() {
            debug!(request = %label, status = raw.status, "Response has error status");
            let error = classify(raw.status, &raw.body).into();
            return State::Failed(Failure {
                raw: Some(raw),
                error,
            });
        }

        match parse_body(&raw) {
            Ok(body) => {
                debug!(request = %label, status = raw.status, "Response materialized");
                State::Ready { raw, body }
            }
            Err(error) => {
                debug!(request = %label, status = raw.status, "Response body is not valid JSON");
                State::Failed(Failure {
                    raw: Some(raw),
                    error,
                })
            }
        }
    }

    fn phase(&self) -> Phase {
        match self {
            State::Pending(_) => Phase::Pending,
            State::Ready { .. } => Phase::Ready,
            State::Failed(_) => Phase::Failed,
        }
    }

    fn body(&self) -> Result<&Value, GowallaError> {
        match self {
            State::Ready { body, .. } => Ok(body),
            State::Failed(failure) => Err(failure.error.clone()),
            State::Pending(_) => Err(not_settled()),
        }
    }

    fn body_mut(&mut self) -> Result<&mut Value, GowallaError> {
        match self {
            State::Ready { body, .. } => Ok(body),
            State::Failed(failure) => Err(failure.error.clone()),
            State::Pending(_) => Err(not_settled()),
        }
    }

    fn raw(&self) -> Result<&RawHttpResult, GowallaError> {
        match self {
            State::Ready { raw, .. } => Ok(raw),
            State::Failed(Failure { raw: Some(raw), .. }) => Ok(raw),
            State::Failed(Failure { raw: None, error }) => Err(error.clone()),
            State::Pending(_) => Err(not_settled()),
        }
    }
}

/// Holds the phase at `Materializing` while the first accessor waits.
///
/// If that accessor is cancelled mid-wait the state is still `Pending`, so
/// dropping the guard without `leave` puts the phase back to `Pending`.
struct MaterializingPhase<'a> {
    phase: &'a AtomicU8,
    settled: bool,
}

impl<'a> MaterializingPhase<'a> {
    fn enter(phase: &'a AtomicU8) -> Self {
        phase.store(Phase::Materializing.as_u8(), Ordering::Release);
        Self {
            phase,
            settled: false,
        }
    }

    fn leave(mut self, settled: Phase) {
        self.phase.store(settled.as_u8(), Ordering::Release);
        self.settled = true;
    }
}

impl Drop for MaterializingPhase<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.phase.store(Phase::Pending.as_u8(), Ordering::Release);
        }
    }
}

fn not_settled() -> GowallaError {
    TransportError::Aborted("response did not settle".into()).into()
}

/// Empty bodies (e.g. `204 No Content`) become `null`; anything else must be JSON.
fn parse_body(raw: &RawHttpResult) -> Result<Value, GowallaError> {
    if raw.body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&raw.body).map_err(|e| GowallaError::InvalidResponse {
        status: raw.status,
        message: e.to_string(),
    })
}

// ============================================================================
// LazyResponse
// ============================================================================

/// A response whose evaluation is deferred until first inspection.
///
/// All accessors are `async`: the first one waits for the request (if it is
/// still running), classifies the status and parses the body. Later calls
/// reuse that result without touching the network again.
///
/// ```rust,no_run
/// use gowalla_client::{ApiErrorKind, GowallaClient, GowallaError, Params};
///
/// # async fn example() -> Result<(), GowallaError> {
/// let client = GowallaClient::new("client-id", "client-secret");
/// let spot = client.get("/spots/7", Params::new()).await;
///
/// match spot.get("name").await {
///     Ok(name) => println!("{name:?}"),
///     Err(err) if err.api_kind() == Some(ApiErrorKind::NotFound) => println!("no such spot"),
///     Err(err) => return Err(err),
/// }
/// # Ok(())
/// # }
/// ```
pub struct LazyResponse {
    label: RequestLabel,
    phase: AtomicU8,
    state: Mutex<State>,
}

impl LazyResponse {
    /// Wraps an exchange that has already completed, e.g. a simulated one.
    pub fn from_raw(raw: RawHttpResult) -> Self {
        Self::completed(RequestLabel::simulated(), Ok(raw))
    }

    pub(crate) fn completed(label: RequestLabel, result: TransportResult) -> Self {
        Self::with_operation(label, Operation::Finished(Some(result)))
    }

    pub(crate) fn spawned(
        label: RequestLabel,
        handle: JoinHandle<TransportResult>,
        tracker: TaskTracker,
    ) -> Self {
        Self::with_operation(label, Operation::Spawned { handle, tracker })
    }

    fn with_operation(label: RequestLabel, operation: Operation) -> Self {
        Self {
            label,
            phase: AtomicU8::new(Phase::Pending.as_u8()),
            state: Mutex::new(State::Pending(operation)),
        }
    }

    /// Current lifecycle phase; never blocks
    pub fn phase(&self) -> Phase {
        Phase::from_u8(self.phase.load(Ordering::Acquire))
    }

    /// Locks the state, settling it first if it is still pending.
    async fn settled(&self) -> MutexGuard<'_, State> {
        let mut state = self.state.lock().await;
        if let State::Pending(operation) = &mut *state {
            let materializing = MaterializingPhase::enter(&self.phase);
            let outcome = operation.wait().await;
            *state = State::settle(&self.label, outcome);
            materializing.leave(state.phase());
        }
        state
    }

    // ------------------------------------------------------------------------
    // Field access
    // ------------------------------------------------------------------------

    /// Returns the top-level value under `key`, or `None` if absent.
    ///
    /// Raises the classified [`ApiError`](crate::ApiError) on an error status.
    pub async fn get(&self, key: impl Into<Key>) -> Result<Option<Value>, GowallaError> {
        let key = key.into();
        let state = self.settled().await;
        Ok(lookup(state.body()?, &key).cloned())
    }

    /// Reads a field and deserializes it into `T`.
    pub async fn field<T: DeserializeOwned>(
        &self,
        key: impl Into<Key>,
    ) -> Result<Option<T>, GowallaError> {
        match self.get(key).await? {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| GowallaError::Deserialize(e.to_string())),
            None => Ok(None),
        }
    }

    /// `true` when `key` is present and its value is not `null`.
    pub async fn contains_key(&self, key: impl Into<Key>) -> Result<bool, GowallaError> {
        let key = key.into();
        let state = self.settled().await;
        Ok(lookup(state.body()?, &key).is_some_and(|value| !value.is_null()))
    }

    /// Sets a top-level value on the parsed body.
    ///
    /// A `null` body becomes an object (or an array, for index 0). Array
    /// indices may replace an element or append at `len`.
    pub async fn set(&self, key: impl Into<Key>, value: Value) -> Result<(), GowallaError> {
        let key = key.into();
        let mut state = self.settled().await;
        let body = state.body_mut()?;

        if body.is_null() {
            *body = match key {
                Key::Index(0) => Value::Array(Vec::new()),
                _ => Value::Object(Map::new()),
            };
        }

        match body {
            Value::Object(map) => {
                map.insert(key.as_name(), value);
                Ok(())
            }
            Value::Array(items) => match key.as_index() {
                Some(index) if index < items.len() => {
                    items[index] = value;
                    Ok(())
                }
                Some(index) if index == items.len() => {
                    items.push(value);
                    Ok(())
                }
                _ => Err(GowallaError::KeyMismatch(format!(
                    "cannot set {key} on an array of {} elements",
                    items.len()
                ))),
            },
            _ => Err(GowallaError::KeyMismatch(format!(
                "cannot set {key} on a scalar body"
            ))),
        }
    }

    /// Removes a top-level value, returning it if it was present.
    pub async fn remove(&self, key: impl Into<Key>) -> Result<Option<Value>, GowallaError> {
        let key = key.into();
        let mut state = self.settled().await;

        let removed = match state.body_mut()? {
            Value::Object(map) => map.remove(&key.as_name()),
            Value::Array(items) => match key.as_index() {
                Some(index) if index < items.len() => Some(items.remove(index)),
                _ => None,
            },
            _ => None,
        };
        Ok(removed)
    }

    /// Number of top-level entries: object keys or array elements.
    ///
    /// A `null` body counts as 0 and a scalar body as 1.
    pub async fn count(&self) -> Result<usize, GowallaError> {
        let state = self.settled().await;
        let count = match state.body()? {
            Value::Object(map) => map.len(),
            Value::Array(items) => items.len(),
            Value::Null => 0,
            _ => 1,
        };
        Ok(count)
    }

    /// Snapshot of the top-level entries, in body order.
    pub async fn entries(&self) -> Result<Entries, GowallaError> {
        let state = self.settled().await;
        let entries: Vec<Entry> = match state.body()? {
            Value::Object(map) => map
                .iter()
                .map(|(name, value)| Entry::Field(name.clone(), value.clone()))
                .collect(),
            Value::Array(items) => items.iter().cloned().map(Entry::Item).collect(),
            Value::Null => Vec::new(),
            scalar => vec![Entry::Item(scalar.clone())],
        };
        Ok(entries.into_iter())
    }

    /// Clone of the whole parsed body
    pub async fn json(&self) -> Result<Value, GowallaError> {
        let state = self.settled().await;
        Ok(state.body()?.clone())
    }

    /// Deserializes the whole body into a typed view such as
    /// [`Spot`](crate::models::Spot) or [`TokenResponse`](crate::models::TokenResponse).
    pub async fn parse<T: DeserializeOwned>(&self) -> Result<T, GowallaError> {
        let body = self.json().await?;
        serde_json::from_value(body).map_err(|e| GowallaError::Deserialize(e.to_string()))
    }

    /// Settles the response and returns its classification error, if any,
    /// without reading a field.
    pub async fn check(&self) -> Result<(), GowallaError> {
        let state = self.settled().await;
        state.body().map(|_| ())
    }

    /// Waits for the exchange and consumes the response.
    pub async fn finish(self) -> Result<(), GowallaError> {
        self.check().await
    }

    // ------------------------------------------------------------------------
    // Metadata (never raises on status)
    // ------------------------------------------------------------------------

    /// HTTP status code. Fails only if the request never completed.
    pub async fn status_code(&self) -> Result<u16, GowallaError> {
        let state = self.settled().await;
        Ok(state.raw()?.status)
    }

    /// Response headers as received
    pub async fn headers(&self) -> Result<Vec<(String, String)>, GowallaError> {
        let state = self.settled().await;
        Ok(state.raw()?.headers.clone())
    }

    /// Case-insensitive lookup of a single header
    pub async fn header(&self, name: &str) -> Result<Option<String>, GowallaError> {
        let state = self.settled().await;
        Ok(state.raw()?.header(name).map(str::to_string))
    }

    /// Raw response body text
    pub async fn response_text(&self) -> Result<String, GowallaError> {
        let state = self.settled().await;
        Ok(state.raw()?.body.clone())
    }

    /// Clone of the full raw result
    pub async fn raw(&self) -> Result<RawHttpResult, GowallaError> {
        let state = self.settled().await;
        Ok(state.raw()?.clone())
    }
}

fn lookup<'a>(body: &'a Value, key: &Key) -> Option<&'a Value> {
    match body {
        Value::Object(map) => map.get(&key.as_name()),
        Value::Array(items) => key.as_index().and_then(|index| items.get(index)),
        _ => None,
    }
}

impl fmt::Debug for LazyResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyResponse")
            .field("request", &self.label.to_string())
            .field("phase", &self.phase())
            .finish()
    }
}

impl Drop for LazyResponse {
    fn drop(&mut self) {
        let State::Pending(operation) = self.state.get_mut() else {
            return;
        };

        if let Some((handle, tracker)) = operation.take_spawned() {
            drain_in_background(self.label.clone(), handle, tracker);
        } else if let Operation::Finished(Some(outcome)) = operation {
            log_unobserved(&self.label, outcome);
        }
    }
}

/// Keeps a dropped background request observed until it completes.
fn drain_in_background(
    label: RequestLabel,
    handle: JoinHandle<TransportResult>,
    tracker: TaskTracker,
) {
    if tokio::runtime::Handle::try_current().is_err() {
        warn!(
            request = %label,
            "Pending response dropped outside a runtime; its outcome will not be observed"
        );
        return;
    }

    tracker.spawn(async move {
        let outcome = match handle.await {
            Ok(result) => result,
            Err(join_err) => Err(TransportError::from(join_err)),
        };
        log_unobserved(&label, &outcome);
    });
}

fn log_unobserved(label: &RequestLabel, outcome: &TransportResult) {
    match outcome {
        Ok(raw) if raw.is_success() => {
            debug!(request = %label, status = raw.status, "Unobserved response completed");
        }
        Ok(raw) => {
            let error = classify(raw.status, &raw.body);
            warn!(
                request = %label,
                status = raw.status,
                kind = %error.kind(),
                "Response dropped without being inspected carried an error"
            );
        }
        Err(err) => {
            warn!(request = %label, error = %err, "Request dropped without being inspected failed");
        }
    }
}
