//! qrgate-keepalive: periodic self-ping for sleepy hosts.
//!
//! Free-tier platforms park a process after a stretch without inbound
//! traffic, which would drop the pairing session mid-scan. `KeepAlive`
//! issues a plain HTTP/1 `GET` against a configured URL on an interval.
//!
//! # Architecture
//!
//! ```text
//! KeepAlive::run
//!   ├── sleep(PingTracker::next_interval)
//!   ├── http_ping() → PingResult
//!   └── PingTracker::record (backoff, failure streak)
//! ```
//!
//! Failed pings double the interval up to ten times the base; a single
//! success restores the base interval.

pub mod error;
pub mod pinger;
pub mod tracker;

pub use error::{KeepAliveError, KeepAliveResult};
pub use pinger::{KeepAlive, PingTarget, http_ping};
pub use tracker::{PingResult, PingTracker};
