//! qrgate-session: the pairing-state register behind qrgate.
//!
//! Tracks the QR code a WhatsApp bot hands over for pairing, its rendered
//! image, and whether the bot has reported a live connection.
//!
//! # Architecture
//!
//! The state is an explicit tagged variant:
//!
//! ```text
//! Idle ──ReceiveQr──▶ AwaitingScan{payload, image} ──MarkConnected──▶ Connected
//!                        ▲        │                                     │
//!                        └────────┘ ReceiveQr (rotation)                │
//!                        ▲                                              │
//!                        └──────────────── ReceiveQr ───────────────────┘
//! ```
//!
//! `Reset` returns any state to `Idle`. Rendering is delegated to a
//! [`QrRenderer`] and runs off the lock; results carry a generation number
//! so a slow render can never attach an image to a newer payload.
//!
//! The `SessionStore` is `Clone` + `Send` + `Sync` (backed by
//! `Arc<RwLock<..>>`) and is meant to be handed to every request handler.

pub mod error;
pub mod render;
pub mod store;
pub mod types;

pub use error::{RenderError, SessionError, SessionResult};
pub use render::QrRenderer;
pub use store::{DEFAULT_FRESHNESS_WINDOW, DEFAULT_RENDER_TIMEOUT, SessionStore, StoreOptions};
pub use types::*;
