//! SessionStore: the shared pairing-state register.
//!
//! Holds one `SessionState` behind one `RwLock`. Writers hold the write
//! lock for a whole transition and readers copy a snapshot out under the
//! read lock, so no caller ever observes a half-applied update.
//!
//! Rendering never runs under the lock. `receive_qr` records the payload,
//! hands rendering to a background task and waits for it at most
//! `render_timeout`; a render that finishes later still lands, provided
//! its generation is still the current one.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{RenderError, SessionError, SessionResult};
use crate::render::QrRenderer;
use crate::types::*;

/// How long a received QR counts as fresh.
pub const DEFAULT_FRESHNESS_WINDOW: Duration = Duration::from_secs(5 * 60);

/// How long `receive_qr` waits for the render before answering.
pub const DEFAULT_RENDER_TIMEOUT: Duration = Duration::from_secs(2);

/// Tunables for a `SessionStore`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    pub freshness_window: Duration,
    pub render_timeout: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            freshness_window: DEFAULT_FRESHNESS_WINDOW,
            render_timeout: DEFAULT_RENDER_TIMEOUT,
        }
    }
}

#[derive(Default)]
struct Inner {
    state: SessionState,
    last_generation: u64,
}

/// Thread-safe session store. Cheap to clone; all clones share one state.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<RwLock<Inner>>,
    renderer: Arc<dyn QrRenderer>,
    options: StoreOptions,
}

impl SessionStore {
    /// Create an idle store with default options.
    pub fn new(renderer: Arc<dyn QrRenderer>) -> Self {
        Self::with_options(renderer, StoreOptions::default())
    }

    pub fn with_options(renderer: Arc<dyn QrRenderer>, options: StoreOptions) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner::default())),
            renderer,
            options,
        }
    }

    pub fn options(&self) -> StoreOptions {
        self.options
    }

    // ── Writes ─────────────────────────────────────────────────────

    /// Record a new QR payload from the bot and render it.
    ///
    /// The payload replaces whatever was current (last write wins) and
    /// moves the session to `AwaitingScan` from any state. A missing or
    /// empty payload is rejected before anything is touched.
    pub async fn receive_qr(&self, payload: Option<&str>) -> SessionResult<ReceiveOutcome> {
        let payload = validate_payload(payload)?;

        let generation = {
            let mut inner = self.inner.write().await;
            inner.last_generation += 1;
            let generation = inner.last_generation;
            inner.state = SessionState::AwaitingScan(PendingQr {
                payload: payload.clone(),
                generation,
                received_at: Instant::now(),
                received_unix: unix_now(),
                image: ImageSlot::Pending,
            });
            generation
        };

        info!(generation, len = payload.len(), "qr payload received");
        debug!(generation, %payload, "qr payload");

        let store = self.clone();
        let task = tokio::spawn(async move { store.render_and_apply(generation, payload).await });

        match tokio::time::timeout(self.options.render_timeout, task).await {
            Ok(Ok(Ok(true))) => Ok(ReceiveOutcome::Rendered),
            Ok(Ok(Ok(false))) => Ok(ReceiveOutcome::Superseded),
            Ok(Ok(Err(e))) => Ok(ReceiveOutcome::RenderFailed(e)),
            Ok(Err(e)) => {
                let err = RenderError::Join(e.to_string());
                self.apply_render(generation, Err(err.clone())).await;
                Ok(ReceiveOutcome::RenderFailed(err))
            }
            Err(_) => {
                debug!(
                    generation,
                    timeout_ms = self.options.render_timeout.as_millis() as u64,
                    "qr render still running, answering without image"
                );
                Ok(ReceiveOutcome::RenderPending)
            }
        }
    }

    /// Record that the bot has a live session. Drops any QR in flight.
    ///
    /// Returns `false` when the session was already connected (no-op).
    pub async fn mark_connected(&self) -> bool {
        let mut inner = self.inner.write().await;
        if let SessionState::Connected { .. } = inner.state {
            debug!("mark_connected on connected session, ignoring");
            return false;
        }
        let previous = inner.state.phase();
        inner.state = SessionState::Connected {
            since_unix: unix_now(),
        };
        info!(from = previous.as_str(), "session connected");
        true
    }

    /// Return to `Idle`, discarding any QR and connection flag.
    ///
    /// Returns the phase the session was in before the reset. Renders
    /// still in flight become stale and are dropped when they land.
    pub async fn reset(&self) -> Phase {
        let mut inner = self.inner.write().await;
        let previous = std::mem::take(&mut inner.state).phase();
        info!(from = previous.as_str(), "session reset");
        previous
    }

    // ── Reads ──────────────────────────────────────────────────────

    /// Snapshot of the session as seen by pollers.
    pub async fn status(&self) -> SessionStatus {
        let inner = self.inner.read().await;
        inner
            .state
            .status(Instant::now(), self.options.freshness_window)
    }

    /// The rendered image of the current payload, or why there is none.
    pub async fn qr_image(&self) -> QrImageLookup {
        self.inner.read().await.state.qr_image()
    }

    /// Raw QR text currently awaiting a scan.
    pub async fn current_payload(&self) -> Option<String> {
        match &self.inner.read().await.state {
            SessionState::AwaitingScan(qr) => Some(qr.payload.clone()),
            _ => None,
        }
    }

    /// Status and image read under one lock, for views that show both.
    pub async fn snapshot(&self) -> (SessionStatus, QrImageLookup) {
        let inner = self.inner.read().await;
        let status = inner
            .state
            .status(Instant::now(), self.options.freshness_window);
        (status, inner.state.qr_image())
    }

    pub async fn phase(&self) -> Phase {
        self.inner.read().await.state.phase()
    }

    // ── Rendering ──────────────────────────────────────────────────

    /// Render `payload` off the async runtime and attach the result.
    ///
    /// `Ok(true)` when the image was attached, `Ok(false)` when the
    /// generation was no longer current, whatever the render produced.
    async fn render_and_apply(&self, generation: u64, payload: String) -> Result<bool, RenderError> {
        let renderer = Arc::clone(&self.renderer);
        let result = tokio::task::spawn_blocking(move || renderer.render(&payload))
            .await
            .unwrap_or_else(|e| Err(RenderError::Join(e.to_string())));

        if !self.apply_render(generation, result.clone()).await {
            return Ok(false);
        }
        result.map(|_| true)
    }

    async fn apply_render(&self, generation: u64, result: Result<QrImage, RenderError>) -> bool {
        let mut inner = self.inner.write().await;
        match &mut inner.state {
            SessionState::AwaitingScan(qr) if qr.generation == generation => {
                match result {
                    Ok(image) => {
                        debug!(generation, bytes = image.bytes.len(), "qr image ready");
                        qr.image = ImageSlot::Ready(image);
                    }
                    Err(e) => {
                        warn!(generation, error = %e, "qr render failed");
                        qr.image = ImageSlot::Failed(e.to_string());
                    }
                }
                true
            }
            _ => {
                debug!(generation, "discarding render for superseded qr");
                false
            }
        }
    }
}

fn validate_payload(payload: Option<&str>) -> SessionResult<String> {
    match payload {
        None => Err(SessionError::InvalidInput("qr payload missing".into())),
        Some("") => Err(SessionError::InvalidInput("qr payload empty".into())),
        Some(p) => Ok(p.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::mpsc;

    /// Renders the payload bytes verbatim so tests can see what was encoded.
    struct EchoRenderer;

    impl QrRenderer for EchoRenderer {
        fn render(&self, payload: &str) -> Result<QrImage, RenderError> {
            Ok(QrImage::new("text/plain", payload.to_string()))
        }
    }

    struct FailingRenderer;

    impl QrRenderer for FailingRenderer {
        fn render(&self, _payload: &str) -> Result<QrImage, RenderError> {
            Err(RenderError::Encode("data too long".into()))
        }
    }

    /// Blocks each render until the test releases it.
    struct GatedRenderer {
        gate: Mutex<mpsc::Receiver<()>>,
    }

    impl QrRenderer for GatedRenderer {
        fn render(&self, payload: &str) -> Result<QrImage, RenderError> {
            let gate = self.gate.lock().unwrap();
            gate.recv().map_err(|e| RenderError::Join(e.to_string()))?;
            Ok(QrImage::new("text/plain", payload.to_string()))
        }
    }

    fn echo_store() -> SessionStore {
        SessionStore::new(Arc::new(EchoRenderer))
    }

    fn gated_store(render_timeout: Duration) -> (SessionStore, mpsc::Sender<()>) {
        let (tx, rx) = mpsc::channel();
        let renderer = GatedRenderer {
            gate: Mutex::new(rx),
        };
        let options = StoreOptions {
            render_timeout,
            ..StoreOptions::default()
        };
        (SessionStore::with_options(Arc::new(renderer), options), tx)
    }

    async fn wait_for_image(store: &SessionStore) -> QrImage {
        for _ in 0..200 {
            if let QrImageLookup::Ready(image) = store.qr_image().await {
                return image;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("image never became ready");
    }

    // ── ReceiveQr ──────────────────────────────────────────────────

    #[tokio::test]
    async fn starts_idle() {
        let store = echo_store();
        let status = store.status().await;
        assert_eq!(status.phase, Phase::Idle);
        assert!(!status.qr_available);
        assert!(!status.connected);
        assert!(!status.scanning);
        assert_eq!(store.qr_image().await, QrImageLookup::NoQr);
    }

    #[tokio::test]
    async fn receive_sets_awaiting_scan() {
        let store = echo_store();
        for payload in ["1@abc", "x", "2@ZmFrZSBwYWlyaW5nIHJlZg==,key,adv"] {
            let outcome = store.receive_qr(Some(payload)).await.unwrap();
            assert_eq!(outcome, ReceiveOutcome::Rendered);

            let status = store.status().await;
            assert!(status.qr_available);
            assert!(!status.connected);
            assert!(status.scanning);
            assert_eq!(status.render, RenderState::Ready);
        }
    }

    #[tokio::test]
    async fn receive_renders_current_payload() {
        let store = echo_store();
        store.receive_qr(Some("1@abc")).await.unwrap();
        let image = store.qr_image().await.into_image().unwrap();
        assert_eq!(&image.bytes[..], b"1@abc");

        store.receive_qr(Some("2@def")).await.unwrap();
        let image = store.qr_image().await.into_image().unwrap();
        assert_eq!(&image.bytes[..], b"2@def");
        assert_eq!(store.current_payload().await.as_deref(), Some("2@def"));
    }

    #[tokio::test]
    async fn empty_or_missing_payload_rejected() {
        let store = echo_store();
        store.receive_qr(Some("keep")).await.unwrap();
        let before = store.status().await;

        for bad in [None, Some("")] {
            let err = store.receive_qr(bad).await.unwrap_err();
            assert!(matches!(err, SessionError::InvalidInput(_)));
        }

        assert_eq!(store.status().await, before);
        assert_eq!(store.current_payload().await.as_deref(), Some("keep"));
    }

    #[tokio::test]
    async fn whitespace_payload_is_still_text() {
        let store = echo_store();
        assert_eq!(
            store.receive_qr(Some("   ")).await.unwrap(),
            ReceiveOutcome::Rendered
        );
        assert_eq!(store.current_payload().await.as_deref(), Some("   "));
        assert_eq!(store.phase().await, Phase::AwaitingScan);
    }

    #[tokio::test]
    async fn invalid_payload_on_idle_stays_idle() {
        let store = echo_store();
        assert!(store.receive_qr(None).await.is_err());
        assert_eq!(store.phase().await, Phase::Idle);
    }

    #[tokio::test]
    async fn render_failure_keeps_payload() {
        let store = SessionStore::new(Arc::new(FailingRenderer));
        let outcome = store.receive_qr(Some("1@abc")).await.unwrap();
        assert_eq!(
            outcome,
            ReceiveOutcome::RenderFailed(RenderError::Encode("data too long".into()))
        );

        let status = store.status().await;
        assert!(status.qr_available);
        assert!(status.scanning);
        assert_eq!(status.render, RenderState::Failed);
        assert_eq!(store.qr_image().await, QrImageLookup::Unrenderable);
        assert_eq!(store.current_payload().await.as_deref(), Some("1@abc"));
    }

    #[tokio::test]
    async fn slow_render_answers_pending_then_lands() {
        let (store, release) = gated_store(Duration::from_millis(20));

        let outcome = store.receive_qr(Some("1@abc")).await.unwrap();
        assert_eq!(outcome, ReceiveOutcome::RenderPending);
        assert_eq!(store.qr_image().await, QrImageLookup::Pending);
        assert_eq!(store.status().await.render, RenderState::Pending);

        release.send(()).unwrap();
        let image = wait_for_image(&store).await;
        assert_eq!(&image.bytes[..], b"1@abc");
    }

    #[tokio::test]
    async fn stale_render_never_overwrites_newer_payload() {
        let (store, release) = gated_store(Duration::from_millis(20));

        assert_eq!(
            store.receive_qr(Some("1@abc")).await.unwrap(),
            ReceiveOutcome::RenderPending
        );
        assert_eq!(
            store.receive_qr(Some("2@def")).await.unwrap(),
            ReceiveOutcome::RenderPending
        );

        // First release finishes the "1@abc" render, which is stale by now.
        release.send(()).unwrap();
        release.send(()).unwrap();

        let image = wait_for_image(&store).await;
        assert_eq!(&image.bytes[..], b"2@def");
    }

    #[tokio::test]
    async fn failed_render_of_superseded_qr_reports_superseded() {
        let (store, release) = gated_store(Duration::from_secs(5));

        let submit = {
            let store = store.clone();
            tokio::spawn(async move { store.receive_qr(Some("1@abc")).await })
        };
        while store.phase().await != Phase::AwaitingScan {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(store.mark_connected().await);

        // Closing the gate makes the in-flight render fail.
        drop(release);

        assert_eq!(
            submit.await.unwrap().unwrap(),
            ReceiveOutcome::Superseded
        );
        assert!(store.status().await.connected);
    }

    #[tokio::test]
    async fn connect_during_render_discards_image() {
        let (store, release) = gated_store(Duration::from_millis(20));
        store.receive_qr(Some("1@abc")).await.unwrap();
        assert!(store.mark_connected().await);

        release.send(()).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(store.qr_image().await, QrImageLookup::NoQr);
        assert!(store.status().await.connected);
    }

    // ── Freshness ──────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn freshness_expires_after_five_minutes() {
        let store = echo_store();
        store.receive_qr(Some("1@abc")).await.unwrap();
        assert!(store.status().await.fresh);

        tokio::time::advance(Duration::from_secs(5 * 60 + 1)).await;

        let status = store.status().await;
        assert!(!status.fresh);
        assert!(status.qr_available, "stale qr is still served");
    }

    #[tokio::test(start_paused = true)]
    async fn rotation_refreshes_window() {
        let store = echo_store();
        store.receive_qr(Some("1@abc")).await.unwrap();
        tokio::time::advance(Duration::from_secs(4 * 60)).await;
        store.receive_qr(Some("2@def")).await.unwrap();
        tokio::time::advance(Duration::from_secs(2 * 60)).await;
        assert!(store.status().await.fresh);
    }

    // ── MarkConnected / Reset ──────────────────────────────────────

    #[tokio::test]
    async fn mark_connected_clears_qr() {
        let store = echo_store();
        store.receive_qr(Some("x")).await.unwrap();
        assert!(store.mark_connected().await);

        let status = store.status().await;
        assert!(status.connected);
        assert!(!status.qr_available);
        assert!(!status.scanning);
        assert!(!status.fresh);
        assert_eq!(store.qr_image().await, QrImageLookup::NoQr);
        assert_eq!(store.current_payload().await, None);
    }

    #[tokio::test]
    async fn mark_connected_from_idle() {
        let store = echo_store();
        assert!(store.mark_connected().await);
        assert_eq!(store.phase().await, Phase::Connected);
    }

    #[tokio::test]
    async fn mark_connected_is_idempotent() {
        let store = echo_store();
        store.receive_qr(Some("x")).await.unwrap();
        assert!(store.mark_connected().await);
        let once = store.status().await;

        assert!(!store.mark_connected().await);
        assert_eq!(store.status().await, once);
    }

    #[tokio::test]
    async fn receive_after_connected_awaits_scan_again() {
        let store = echo_store();
        store.mark_connected().await;
        store.receive_qr(Some("3@ghi")).await.unwrap();

        let status = store.status().await;
        assert_eq!(status.phase, Phase::AwaitingScan);
        assert!(!status.connected);
        assert!(status.scanning);
    }

    #[tokio::test]
    async fn reset_returns_to_idle() {
        let store = echo_store();
        assert_eq!(store.reset().await, Phase::Idle);

        store.receive_qr(Some("x")).await.unwrap();
        assert_eq!(store.reset().await, Phase::AwaitingScan);
        assert_eq!(store.phase().await, Phase::Idle);

        store.mark_connected().await;
        assert_eq!(store.reset().await, Phase::Connected);
        assert_eq!(store.status().await.phase, Phase::Idle);
    }

    #[tokio::test]
    async fn snapshot_pairs_status_with_image() {
        let store = echo_store();
        let (status, image) = store.snapshot().await;
        assert_eq!(status.phase, Phase::Idle);
        assert_eq!(image, QrImageLookup::NoQr);

        store.receive_qr(Some("1@abc")).await.unwrap();
        let (status, image) = store.snapshot().await;
        assert_eq!(status.render, RenderState::Ready);
        assert_eq!(&image.into_image().unwrap().bytes[..], b"1@abc");
    }

    // ── Concurrency ────────────────────────────────────────────────

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_snapshots_are_consistent() {
        let store = echo_store();
        let mut tasks = Vec::new();

        for i in 0..32 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                if i % 4 == 0 {
                    store.mark_connected().await;
                } else {
                    store.receive_qr(Some(&format!("{i}@qr"))).await.unwrap();
                }
            }));
        }
        for _ in 0..32 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                let s = store.status().await;
                if s.connected {
                    assert!(!s.qr_available && !s.scanning);
                }
                if s.scanning {
                    assert!(s.qr_available && !s.connected);
                }
            }));
        }
        for t in tasks {
            t.await.unwrap();
        }

        // Whatever won, any image present belongs to the current payload.
        if let (Some(payload), QrImageLookup::Ready(image)) =
            (store.current_payload().await, store.qr_image().await)
        {
            assert_eq!(&image.bytes[..], payload.as_bytes());
        }
    }
}
