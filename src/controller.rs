//! Regeneration Controller: debounces parameter edits and republishes
//! geometry.
//!
//! Every edit bumps a revision counter and schedules a regeneration after
//! the debounce window. A scheduled run proceeds only if its revision is
//! still the latest when the window closes, so a burst of edits collapses
//! into a single run using the final values. Results are revision-checked
//! again before publication; a run that was superseded while computing is
//! discarded, which keeps the published state consistent with the newest
//! inputs even when an older run finishes last.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::sleep;

use crate::config::{ExtrusionConfig, HollowMode};
use crate::engine::{Engine, ExtrusionEngine, GeometryResult};
use crate::svg::VectorDocument;

/// Publicly observable pipeline state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PipelineState {
    /// No document loaded yet.
    #[default]
    Idle,
    /// A regeneration is running.
    Loading,
    /// Geometry is available via [`RegenerationController::result`].
    Ready,
    /// The last regeneration failed. No retry happens until the next edit.
    Error(String),
}

struct Session {
    document: Option<VectorDocument>,
    config: ExtrusionConfig,
    result: Option<Arc<GeometryResult>>,
}

struct Inner {
    engine: Arc<dyn Engine>,
    debounce: Duration,
    revision: AtomicU64,
    executed_runs: AtomicU64,
    state_tx: watch::Sender<PipelineState>,
    session: Mutex<Session>,
    // Serializes the revision re-check and state publication so a stale
    // run can never overwrite a newer one.
    publish: tokio::sync::Mutex<()>,
}

impl Inner {
    fn session(&self) -> MutexGuard<'_, Session> {
        // A panicked regeneration leaves the session itself intact.
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Debounced, cancel-superseded regeneration over an [`Engine`].
///
/// Cheap to clone; clones share the same session and state channel.
#[derive(Clone)]
pub struct RegenerationController {
    inner: Arc<Inner>,
}

impl RegenerationController {
    /// Creates a controller over the production engine.
    #[must_use]
    pub fn new(debounce: Duration) -> Self {
        Self::with_engine(Arc::new(ExtrusionEngine::default()), debounce)
    }

    /// Creates a controller over a caller-supplied engine.
    #[must_use]
    pub fn with_engine(engine: Arc<dyn Engine>, debounce: Duration) -> Self {
        let (state_tx, _) = watch::channel(PipelineState::Idle);
        Self {
            inner: Arc::new(Inner {
                engine,
                debounce,
                revision: AtomicU64::new(0),
                executed_runs: AtomicU64::new(0),
                state_tx,
                session: Mutex::new(Session {
                    document: None,
                    config: ExtrusionConfig::default(),
                    result: None,
                }),
                publish: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// Subscribes to state transitions.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<PipelineState> {
        self.inner.state_tx.subscribe()
    }

    /// Current pipeline state.
    #[must_use]
    pub fn state(&self) -> PipelineState {
        self.inner.state_tx.borrow().clone()
    }

    /// Latest published geometry, if any.
    #[must_use]
    pub fn result(&self) -> Option<Arc<GeometryResult>> {
        self.inner.session().result.clone()
    }

    /// Snapshot of the current configuration.
    #[must_use]
    pub fn config(&self) -> ExtrusionConfig {
        self.inner.session().config
    }

    /// Number of times the engine has actually run. Edits that were
    /// coalesced or superseded do not count.
    #[must_use]
    pub fn executed_runs(&self) -> u64 {
        self.inner.executed_runs.load(Ordering::SeqCst)
    }

    /// Loads a new document and schedules a regeneration.
    ///
    /// Any hollow override belongs to the previous document's content and
    /// is reset to automatic detection.
    pub fn load_document(&self, document: VectorDocument) {
        {
            let mut session = self.inner.session();
            session.document = Some(document);
            session.config.hollow = HollowMode::Auto;
        }
        self.schedule();
    }

    /// Applies an edit to the configuration and schedules a regeneration.
    pub fn update_config(&self, edit: impl FnOnce(&mut ExtrusionConfig)) {
        {
            let mut session = self.inner.session();
            edit(&mut session.config);
        }
        self.schedule();
    }

    /// Forces or releases the hollow decision.
    pub fn set_hollow_override(&self, mode: HollowMode) {
        self.update_config(|config| config.hollow = mode);
    }

    /// Bumps the revision and spawns a debounced regeneration task for it.
    fn schedule(&self) {
        let revision = self.inner.revision.fetch_add(1, Ordering::SeqCst) + 1;
        let inner = Arc::clone(&self.inner);

        tokio::spawn(async move {
            sleep(inner.debounce).await;
            if inner.revision.load(Ordering::SeqCst) != revision {
                // Coalesced away by a later edit.
                return;
            }

            let (document, config) = {
                let session = inner.session();
                let Some(document) = session.document.clone() else {
                    return;
                };
                (document, session.config)
            };

            {
                // Same protocol as the result below: only the latest
                // revision may transition the published state. Without
                // this a run superseded right here could emit Loading
                // after its successor already published Ready.
                let _publish = inner.publish.lock().await;
                if inner.revision.load(Ordering::SeqCst) != revision {
                    return;
                }
                inner.state_tx.send_replace(PipelineState::Loading);
            }

            let engine = Arc::clone(&inner.engine);
            let runs = Arc::clone(&inner);
            let outcome = tokio::task::spawn_blocking(move || {
                runs.executed_runs.fetch_add(1, Ordering::SeqCst);
                engine.generate(&document, &config)
            })
            .await;

            let _publish = inner.publish.lock().await;
            if inner.revision.load(Ordering::SeqCst) != revision {
                // A newer run owns the published state now.
                return;
            }

            match outcome {
                Ok(Ok(result)) => {
                    inner.session().result = Some(Arc::new(result));
                    inner.state_tx.send_replace(PipelineState::Ready);
                }
                Ok(Err(err)) => {
                    tracing::warn!(revision, error = %err, "regeneration failed");
                    inner.state_tx.send_replace(PipelineState::Error(err.to_string()));
                }
                Err(join_err) => {
                    tracing::error!(revision, error = %join_err, "regeneration task panicked");
                    inner
                        .state_tx
                        .send_replace(PipelineState::Error(join_err.to_string()));
                }
            }
        });
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::BevelConfig;
    use crate::error::Result;
    use tokio::time::{timeout, Duration};

    const SQUARE: &str = r#"<svg><path d="M0 0 L10 0 L10 10 L0 10 Z"/></svg>"#;
    const DEBOUNCE: Duration = Duration::from_millis(20);

    // Honors RUST_LOG when debugging a flaky ordering.
    fn trace_init() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    /// Polls until `cond` holds. Polling sidesteps the watch channel's
    /// conflation of intermediate states.
    async fn wait_until(mut cond: impl FnMut() -> bool) {
        timeout(Duration::from_secs(5), async {
            while !cond() {
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("timed out waiting for condition");
    }

    /// Waits for the `n`th engine run to finish and publish.
    async fn wait_for_run(controller: &RegenerationController, n: u64) {
        let c = controller.clone();
        wait_until(move || {
            c.executed_runs() >= n && c.state() != PipelineState::Loading
        })
        .await;
    }

    /// Delegates to the production engine after a fixed delay, so a run
    /// can be superseded while it is still computing.
    struct SlowEngine {
        delay: Duration,
        inner: ExtrusionEngine,
    }

    impl Engine for SlowEngine {
        fn generate(
            &self,
            doc: &VectorDocument,
            config: &ExtrusionConfig,
        ) -> Result<GeometryResult> {
            std::thread::sleep(self.delay);
            self.inner.generate(doc, config)
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn starts_idle_without_geometry() {
        let controller = RegenerationController::new(DEBOUNCE);
        assert_eq!(controller.state(), PipelineState::Idle);
        assert!(controller.result().is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn load_produces_geometry() {
        let controller = RegenerationController::new(DEBOUNCE);
        controller.load_document(VectorDocument::new(SQUARE, "square.svg"));
        wait_for_run(&controller, 1).await;

        assert_eq!(controller.state(), PipelineState::Ready);
        let result = controller.result().unwrap();
        assert_eq!(result.triangle_count() % 2, 0);
        assert!(!result.hollow);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn subscribers_observe_loading_then_ready() {
        let controller = RegenerationController::with_engine(
            Arc::new(SlowEngine {
                delay: Duration::from_millis(100),
                inner: ExtrusionEngine::default(),
            }),
            DEBOUNCE,
        );
        let mut rx = controller.subscribe();
        controller.load_document(VectorDocument::new(SQUARE, "square.svg"));

        timeout(Duration::from_secs(5), rx.wait_for(|s| *s == PipelineState::Loading))
            .await
            .unwrap()
            .unwrap();
        timeout(Duration::from_secs(5), rx.wait_for(|s| *s == PipelineState::Ready))
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn edit_burst_coalesces_into_one_run() {
        trace_init();
        let controller = RegenerationController::new(DEBOUNCE);
        controller.load_document(VectorDocument::new(SQUARE, "square.svg"));
        wait_for_run(&controller, 1).await;
        let runs_after_load = controller.executed_runs();

        for depth in 1..=10 {
            controller.update_config(|c| c.depth = f64::from(depth));
        }
        wait_for_run(&controller, runs_after_load + 1).await;
        sleep(DEBOUNCE * 3).await;

        assert_eq!(controller.executed_runs(), runs_after_load + 1);
        let result = controller.result().unwrap();
        assert!((result.aabb.size().z - 12.0).abs() < 1e-9, "uses the final depth");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn config_edit_without_document_stays_idle() {
        let controller = RegenerationController::new(DEBOUNCE);
        controller.update_config(|c| c.depth = 3.0);
        sleep(DEBOUNCE * 4).await;
        assert_eq!(controller.state(), PipelineState::Idle);
        assert_eq!(controller.executed_runs(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn superseding_edit_discards_the_stale_result() {
        trace_init();
        let controller = RegenerationController::with_engine(
            Arc::new(SlowEngine {
                delay: Duration::from_millis(150),
                inner: ExtrusionEngine::default(),
            }),
            Duration::from_millis(5),
        );

        controller.load_document(VectorDocument::new(SQUARE, "square.svg"));
        // Let the first run start computing, then supersede it.
        sleep(Duration::from_millis(50)).await;
        controller.update_config(|c| c.depth = 42.0);

        // Both runs may execute, but only the newer one may publish.
        let c = controller.clone();
        wait_until(move || {
            c.result()
                .is_some_and(|r| (r.aabb.size().z - 44.0).abs() < 1e-9)
        })
        .await;

        sleep(Duration::from_millis(300)).await;
        let result = controller.result().unwrap();
        assert!((result.aabb.size().z - 44.0).abs() < 1e-9, "stale run overwrote");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn state_settles_at_ready_after_interleaved_edits() {
        trace_init();
        // Edits land while earlier runs are still computing, so several
        // runs overlap and finish out of order. Whatever the
        // interleaving, no superseded run may transition the published
        // state afterwards: the controller must settle at Ready with the
        // final depth, never stick at Loading.
        let controller = RegenerationController::with_engine(
            Arc::new(SlowEngine {
                delay: Duration::from_millis(40),
                inner: ExtrusionEngine::default(),
            }),
            Duration::from_millis(5),
        );
        controller.load_document(VectorDocument::new(SQUARE, "square.svg"));
        for depth in 1..=5 {
            sleep(Duration::from_millis(25)).await;
            controller.update_config(|c| c.depth = f64::from(depth));
        }

        let c = controller.clone();
        wait_until(move || {
            c.state() == PipelineState::Ready
                && c.result()
                    .is_some_and(|r| (r.aabb.size().z - 7.0).abs() < 1e-9)
        })
        .await;

        // Let every straggler run drain, then confirm nothing stale
        // republished over the settled state.
        sleep(Duration::from_millis(200)).await;
        assert_eq!(controller.state(), PipelineState::Ready);
        let result = controller.result().unwrap();
        assert!((result.aabb.size().z - 7.0).abs() < 1e-9);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failure_is_reported_and_not_retried() {
        let controller = RegenerationController::new(DEBOUNCE);
        controller.load_document(VectorDocument::new("<svg></svg>", "empty.svg"));

        let c = controller.clone();
        wait_until(move || matches!(c.state(), PipelineState::Error(_))).await;

        let runs = controller.executed_runs();
        sleep(DEBOUNCE * 5).await;
        assert_eq!(controller.executed_runs(), runs, "no automatic retry");

        // The next edit recovers.
        controller.load_document(VectorDocument::new(SQUARE, "square.svg"));
        wait_for_run(&controller, runs + 1).await;
        assert_eq!(controller.state(), PipelineState::Ready);
        assert!(controller.result().is_some());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn hollow_override_survives_other_edits_but_not_reload() {
        let hollow_doc = concat!(
            r#"<path d="M0 0 L20 0 L20 20 L0 20 Z"/>"#,
            r#"<circle cx="10" cy="10" r="4"/>"#,
        );
        let controller = RegenerationController::new(DEBOUNCE);
        controller.load_document(VectorDocument::new(hollow_doc, "ring.svg"));
        wait_for_run(&controller, 1).await;
        assert!(controller.result().unwrap().hollow);

        controller.set_hollow_override(HollowMode::Override(false));
        wait_for_run(&controller, 2).await;
        assert!(!controller.result().unwrap().hollow);

        // Unrelated edits keep the override.
        controller.update_config(|c| c.bevel = BevelConfig::disabled());
        wait_for_run(&controller, 3).await;
        assert!(!controller.result().unwrap().hollow);
        assert_eq!(controller.config().hollow, HollowMode::Override(false));

        // A new document resets it to automatic detection.
        controller.load_document(VectorDocument::new(hollow_doc, "ring2.svg"));
        wait_for_run(&controller, 4).await;
        assert_eq!(controller.config().hollow, HollowMode::Auto);
        assert!(controller.result().unwrap().hollow);
    }
}
