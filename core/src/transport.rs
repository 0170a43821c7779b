//! Executes `HttpRequest` values over the network.
//!
//! # Design
//! The client never owns a process-wide HTTP stack. A `Transport` is handed
//! in at construction, which is also the seam tests use to serve canned
//! responses without a socket.
//!
//! `UreqTransport` keeps the caller responsive: a cancel or an expired
//! deadline returns within one poll interval even while the server is still
//! silent. The abandoned worker finishes (or times out) on its own and its
//! result is discarded.

use std::fmt;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use tracing::debug;

use crate::context::CallContext;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// How often a waiting call re-checks its context.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Performs exactly one HTTP round-trip per call.
///
/// Status codes are data: a 4xx/5xx response is `Ok`, classification is the
/// client's job.
pub trait Transport: Send + Sync {
    fn execute(&self, request: HttpRequest, ctx: &CallContext) -> Result<HttpResponse, ApiError>;
}

/// Blocking transport backed by a `ureq::Agent`.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UreqTransport").finish_non_exhaustive()
    }
}

impl UreqTransport {
    /// Agent with no timeout beyond what each `CallContext` imposes.
    pub fn new() -> Self {
        Self::with_timeout(None)
    }

    /// Agent whose requests never run longer than `timeout`.
    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(timeout)
            .build()
            .new_agent();
        Self { agent }
    }

    pub fn from_agent(agent: ureq::Agent) -> Self {
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: HttpRequest, ctx: &CallContext) -> Result<HttpResponse, ApiError> {
        ctx.check()?;
        debug!(method = request.method.as_str(), path = %request.path, "sending request");

        // ureq blocks until the exchange ends, so it runs on a worker and the
        // caller watches the context while waiting for the result.
        let agent = self.agent.clone();
        let timeout = ctx.remaining();
        let (tx, rx) = mpsc::sync_channel(1);
        thread::Builder::new()
            .name("splitwise-http".to_string())
            .spawn(move || {
                // The receiver is gone when the caller gave up; nothing to report.
                let _ = tx.send(round_trip(&agent, request, timeout));
            })
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        loop {
            let wait = ctx
                .remaining()
                .map_or(POLL_INTERVAL, |left| left.min(POLL_INTERVAL));
            match rx.recv_timeout(wait) {
                Ok(result) => {
                    // A response that raced a cancel is dropped.
                    if ctx.is_cancelled() {
                        return Err(ApiError::Cancelled);
                    }
                    let response = result?;
                    debug!(status = response.status, "received response");
                    return Ok(response);
                }
                Err(RecvTimeoutError::Timeout) => {
                    if let Err(err) = ctx.check() {
                        debug!(%err, "abandoning in-flight request");
                        return Err(err);
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(ApiError::Transport("request worker exited without a result".to_string()));
                }
            }
        }
    }
}

/// One blocking exchange, capped at `timeout` when the call has a deadline.
fn round_trip(
    agent: &ureq::Agent,
    request: HttpRequest,
    timeout: Option<Duration>,
) -> Result<HttpResponse, ApiError> {
    let result = match request.method {
        HttpMethod::Get => {
            let mut builder = agent.get(&request.path);
            for (key, value) in &request.headers {
                builder = builder.header(key.as_str(), value.as_str());
            }
            if timeout.is_some() {
                builder = builder.config().timeout_global(timeout).build();
            }
            builder.call()
        }
        HttpMethod::Post => {
            let mut builder = agent.post(&request.path);
            for (key, value) in &request.headers {
                builder = builder.header(key.as_str(), value.as_str());
            }
            if timeout.is_some() {
                builder = builder.config().timeout_global(timeout).build();
            }
            match request.body {
                Some(body) => builder.send(body.as_bytes()),
                None => builder.send_empty(),
            }
        }
    };

    let mut response = result.map_err(transport_error)?;
    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();
    let body = response.body_mut().read_to_string().map_err(transport_error)?;

    Ok(HttpResponse {
        status,
        headers,
        body,
    })
}

fn transport_error(err: ureq::Error) -> ApiError {
    match err {
        ureq::Error::Timeout(_) => ApiError::Timeout,
        other => ApiError::Transport(other.to_string()),
    }
}
