// Raster primitives capability: explicit initialize/acquire/shutdown lifecycle

pub mod ops;

use std::sync::{Arc, RwLock};

use tracing::{debug, info};

pub use ops::Raster;

use crate::error::TraceError;

enum RuntimeState {
    Ready(Arc<Raster>),
    ShutDown,
}

/// Owner of the raster capability.
///
/// Created once with [`RasterRuntime::initialize`] and injected into the
/// orchestrator. Stages obtain the primitives through [`RasterRuntime::acquire`],
/// which fails with `RasterUnavailable` after [`RasterRuntime::shutdown`].
pub struct RasterRuntime {
    state: RwLock<RuntimeState>,
}

impl RasterRuntime {
    pub fn initialize() -> crate::error::Result<Self> {
        let raster = Raster::new();
        info!(backend = raster.backend_name(), "Raster capability ready");
        Ok(Self {
            state: RwLock::new(RuntimeState::Ready(Arc::new(raster))),
        })
    }

    /// Scoped acquisition of the raster primitives for one pass.
    pub fn acquire(&self) -> crate::error::Result<Arc<Raster>> {
        let state = self
            .state
            .read()
            .map_err(|_| TraceError::raster_unavailable("runtime lock poisoned"))?;
        match &*state {
            RuntimeState::Ready(raster) => Ok(Arc::clone(raster)),
            RuntimeState::ShutDown => Err(TraceError::raster_unavailable(
                "raster runtime has been shut down",
            )),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state.read().as_deref(), Ok(RuntimeState::Ready(_)))
    }

    /// Release the capability. Handles already acquired stay valid until dropped.
    pub fn shutdown(&self) {
        if let Ok(mut state) = self.state.write() {
            *state = RuntimeState::ShutDown;
            debug!("Raster capability shut down");
        }
    }
}
