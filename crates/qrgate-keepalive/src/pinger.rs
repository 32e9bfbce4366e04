//! Keep-alive loop and the HTTP ping it sends.

use std::time::Duration;

use http::Uri;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::error::{KeepAliveError, KeepAliveResult};
use crate::tracker::{PingResult, PingTracker};

/// A validated `http://host[:port]/path` ping target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PingTarget {
    url: String,
    /// `host:port` to dial.
    address: String,
    /// Value for the `host` header.
    authority: String,
    path: String,
}

impl PingTarget {
    pub fn parse(url: &str) -> KeepAliveResult<Self> {
        let invalid = |reason: String| KeepAliveError::InvalidUrl {
            url: url.to_string(),
            reason,
        };

        let uri: Uri = url.parse().map_err(|e: http::uri::InvalidUri| invalid(e.to_string()))?;
        match uri.scheme_str() {
            Some("http") => {}
            Some(other) => return Err(invalid(format!("unsupported scheme {other}"))),
            None => return Err(invalid("missing scheme".to_string())),
        }
        let authority = uri
            .authority()
            .ok_or_else(|| invalid("missing host".to_string()))?;

        let port = authority.port_u16().unwrap_or(80);
        let path = uri
            .path_and_query()
            .map(|p| p.as_str())
            .filter(|p| !p.is_empty())
            .unwrap_or("/");

        Ok(Self {
            url: url.to_string(),
            address: format!("{}:{port}", authority.host()),
            authority: authority.as_str().to_string(),
            path: path.to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Send one `GET` to `target`.
///
/// Returns `Ok` for 2xx, `BadStatus` for any other status, and `Failed`
/// when the connection fails or `timeout` elapses.
pub async fn http_ping(target: &PingTarget, timeout: Duration) -> PingResult {
    let url = target.url();

    let result = tokio::time::timeout(timeout, async {
        let stream = match tokio::net::TcpStream::connect(target.address()).await {
            Ok(s) => s,
            Err(e) => {
                debug!(error = %e, %url, "keep-alive connect failed");
                return PingResult::Failed;
            }
        };

        let io = hyper_util::rt::TokioIo::new(stream);
        let (mut sender, conn) = match hyper::client::conn::http1::handshake(io).await {
            Ok(pair) => pair,
            Err(e) => {
                debug!(error = %e, %url, "keep-alive handshake failed");
                return PingResult::Failed;
            }
        };

        // Drive the connection in the background.
        tokio::spawn(async move {
            let _ = conn.await;
        });

        let req = match http::Request::builder()
            .method("GET")
            .uri(target.path())
            .header("host", &target.authority)
            .header("user-agent", "qrgate-keepalive/0.1")
            .header("connection", "close")
            .body(http_body_util::Empty::<bytes::Bytes>::new())
        {
            Ok(req) => req,
            Err(e) => {
                debug!(error = %e, %url, "keep-alive request build failed");
                return PingResult::Failed;
            }
        };

        match sender.send_request(req).await {
            Ok(resp) if resp.status().is_success() => PingResult::Ok,
            Ok(resp) => {
                debug!(status = %resp.status(), %url, "keep-alive non-2xx");
                PingResult::BadStatus
            }
            Err(e) => {
                debug!(error = %e, %url, "keep-alive request failed");
                PingResult::Failed
            }
        }
    })
    .await;

    result.unwrap_or_else(|_| {
        debug!(%url, "keep-alive ping timed out");
        PingResult::Failed
    })
}

/// Background pinger for one target.
#[derive(Debug, Clone)]
pub struct KeepAlive {
    target: PingTarget,
    interval: Duration,
    timeout: Duration,
}

impl KeepAlive {
    pub fn new(url: &str, interval: Duration, timeout: Duration) -> KeepAliveResult<Self> {
        if interval.is_zero() {
            return Err(KeepAliveError::ZeroInterval);
        }
        Ok(Self {
            target: PingTarget::parse(url)?,
            interval,
            timeout,
        })
    }

    pub fn target(&self) -> &PingTarget {
        &self.target
    }

    /// Ping until `shutdown` flips (or its sender goes away).
    ///
    /// Sleeps before the first ping so the local server has time to bind
    /// when the target is this process. Returns the final tracker.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> PingTracker {
        let mut tracker = PingTracker::new(self.interval);
        info!(
            url = %self.target.url(),
            interval_secs = self.interval.as_secs(),
            "keep-alive started"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(tracker.next_interval()) => {}
                _ = shutdown.changed() => break,
            }

            let result = http_ping(&self.target, self.timeout).await;
            let next = tracker.record(result);
            debug!(?result, next_secs = next.as_secs(), "keep-alive ping");
        }

        info!(pings = tracker.total_pings(), "keep-alive stopped");
        tracker
    }
}
