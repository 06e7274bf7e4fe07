// Pipeline orchestrator: debounced, superseding passes over one image/marker/params input

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use super::buffers::BufferLedger;
use super::pass::{PassOutput, PassSettings, ProcessingParams, run_pass};
use crate::config::settings::Settings;
use crate::error::TraceError;
use crate::markers::MarkerSet;
use crate::raster::RasterRuntime;

/// Externally visible pipeline state.
///
/// A superseded pass never shows up here; its result is dropped.
#[derive(Debug, Clone)]
pub enum PipelineState {
    Idle,
    Running { pass: u64 },
    Succeeded(Arc<PassOutput>),
    Failed { pass: u64, error: Arc<TraceError> },
}

/// One set of pass inputs. Cloned on submit so a failed pass can be retried.
#[derive(Debug, Clone)]
pub struct PassRequest {
    /// Encoded source image (PNG, JPEG, ...).
    pub image: Arc<[u8]>,
    pub markers: Option<MarkerSet>,
    pub params: ProcessingParams,
}

#[derive(Debug, Clone, Copy)]
pub struct OrchestratorConfig {
    pub pass: PassSettings,
    /// Delay before a pass starts; zero disables coalescing.
    pub debounce: Duration,
}

impl OrchestratorConfig {
    /// Pipeline-wide configuration from `settings.yaml`.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            pass: PassSettings {
                marker_size_mm: settings.marker_size_mm,
                canvas_width: settings.canvas_width,
                require_calibration: settings.require_calibration,
            },
            debounce: Duration::from_millis(settings.debounce_ms),
        }
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            pass: PassSettings::default(),
            debounce: Duration::from_millis(150),
        }
    }
}

struct Inner {
    state: PipelineState,
    /// Output handed to presentation; kept until a newer pass succeeds.
    displayed: Option<Arc<PassOutput>>,
    last_request: Option<PassRequest>,
}

/// Sequences passes for one input. Requests may overlap: the latest one wins.
pub struct Orchestrator {
    runtime: Arc<RasterRuntime>,
    config: OrchestratorConfig,
    ledger: BufferLedger,
    latest_pass: AtomicU64,
    inner: Mutex<Inner>,
}

impl Orchestrator {
    pub fn new(runtime: Arc<RasterRuntime>, config: OrchestratorConfig) -> Self {
        Self {
            runtime,
            config,
            ledger: BufferLedger::new(),
            latest_pass: AtomicU64::new(0),
            inner: Mutex::new(Inner {
                state: PipelineState::Idle,
                displayed: None,
                last_request: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn is_current(&self, pass: u64) -> bool {
        self.latest_pass.load(Ordering::SeqCst) == pass
    }

    pub fn state(&self) -> PipelineState {
        self.lock().state.clone()
    }

    /// Output of the last successful pass, if any. Stays available while a
    /// newer pass runs or after it fails.
    pub fn displayed(&self) -> Option<Arc<PassOutput>> {
        self.lock().displayed.clone()
    }

    /// Ledger of raster buffers owned by passes of this orchestrator.
    pub fn ledger(&self) -> &BufferLedger {
        &self.ledger
    }

    /// Submit new inputs and run a pass for them.
    ///
    /// Returns the committed state, or `None` when a later request
    /// superseded this one before it could commit.
    #[instrument(skip_all, fields(threshold = request.params.threshold))]
    pub async fn submit(&self, request: PassRequest) -> Option<PipelineState> {
        // 採番は状態更新と同じロック内で行う
        let pass = {
            let mut inner = self.lock();
            let pass = self.latest_pass.fetch_add(1, Ordering::SeqCst) + 1;
            inner.state = PipelineState::Running { pass };
            inner.last_request = Some(request.clone());
            pass
        };
        debug!(pass, "Pass submitted");

        if !self.config.debounce.is_zero() {
            tokio::time::sleep(self.config.debounce).await;
            if !self.is_current(pass) {
                debug!(pass, "Superseded during debounce");
                return None;
            }
        }

        let result = self.execute(pass, request).await;
        self.commit(pass, result)
    }

    /// Re-run the last request after a failure, with identical inputs.
    pub async fn retry(&self) -> crate::error::Result<Option<PipelineState>> {
        let request = {
            let inner = self.lock();
            match (&inner.state, &inner.last_request) {
                (PipelineState::Failed { .. }, Some(request)) => request.clone(),
                _ => return Err(TraceError::config("no failed pass to retry")),
            }
        };
        info!("Retrying failed pass");
        Ok(self.submit(request).await)
    }

    /// Drop every buffer this orchestrator holds and return to `Idle`.
    ///
    /// In-flight passes are superseded; their results are released on
    /// completion.
    pub fn teardown(&self) {
        let mut inner = self.lock();
        self.latest_pass.fetch_add(1, Ordering::SeqCst);
        inner.state = PipelineState::Idle;
        inner.displayed = None;
        inner.last_request = None;
        debug!(live = self.ledger.live(), "Orchestrator torn down");
    }

    async fn execute(
        &self,
        pass: u64,
        request: PassRequest,
    ) -> Option<crate::error::Result<PassOutput>> {
        let raster = match self.runtime.acquire() {
            Ok(raster) => raster,
            Err(e) => return Some(Err(e)),
        };

        let decoder = Arc::clone(&raster);
        let bytes = Arc::clone(&request.image);
        let decoded = tokio::task::spawn_blocking(move || decoder.decode(&bytes))
            .await
            .unwrap_or_else(|e| Err(TraceError::decode(format!("decode task failed: {e}"))));

        if !self.is_current(pass) {
            debug!(pass, "Superseded during decode");
            return None;
        }

        let source = match decoded {
            Ok(image) => image,
            Err(e) => return Some(Err(e)),
        };

        Some(run_pass(
            &raster,
            source,
            request.markers.as_ref(),
            &request.params,
            &self.config.pass,
            &self.ledger,
        ))
    }

    fn commit(
        &self,
        pass: u64,
        result: Option<crate::error::Result<PassOutput>>,
    ) -> Option<PipelineState> {
        let result = result?;
        let mut inner = self.lock();
        // latest_pass を同じロック内で再確認し、後発の要求を上書きしない
        if !self.is_current(pass) {
            debug!(pass, "Superseded before commit");
            return None;
        }
        let next = match result {
            Ok(output) => {
                info!(
                    pass,
                    paths = output.document.paths().len(),
                    degraded = output.is_degraded(),
                    "Pass succeeded"
                );
                let output = Arc::new(output);
                inner.displayed = Some(Arc::clone(&output));
                PipelineState::Succeeded(output)
            }
            Err(e) => {
                warn!(pass, error = %e, "Pass failed");
                PipelineState::Failed {
                    pass,
                    error: Arc::new(e),
                }
            }
        };
        inner.state = next.clone();
        Some(next)
    }
}
