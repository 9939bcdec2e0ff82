//! Native runtime loader
//!
//! Loads an agent module at most once and runs its static setup exactly once.
//! Concurrent first callers race on a `OnceLock`: one performs the load, the
//! rest block until it completes and then observe the same outcome.
//!
//! Lifecycle: `Unloaded -> Loaded`, or `Unloaded -> Failed`. Both end states
//! are permanent for the life of the loader. A failed load is cached and
//! handed back to every later caller so the agent type stays unavailable.
//! Resources the static setup allocates on the native side live until the
//! process exits; there is no teardown.

use kriegspiel_core::{BridgeError, Result};
use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing::{error, info};

use crate::adapter::NativeModule;

type Opener<M> = Box<dyn Fn() -> Result<M> + Send + Sync>;

/// Observable loader state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderStatus {
    Unloaded,
    Loaded,
    Failed,
}

/// One-time loader for a native module
pub struct RuntimeLoader<M: NativeModule> {
    library: String,
    open: Opener<M>,
    module: OnceLock<std::result::Result<Arc<M>, BridgeError>>,
}

impl<M: NativeModule> RuntimeLoader<M> {
    /// Create a loader; `open` runs on the first `ensure_loaded` only
    pub fn new(
        library: impl Into<String>,
        open: impl Fn() -> Result<M> + Send + Sync + 'static,
    ) -> Self {
        Self {
            library: library.into(),
            open: Box::new(open),
            module: OnceLock::new(),
        }
    }

    /// Load the module and run its static setup, once per loader.
    ///
    /// Later calls are no-ops that return the cached module, or the cached
    /// fatal error if the first attempt failed.
    pub fn ensure_loaded(&self) -> Result<Arc<M>> {
        self.module
            .get_or_init(|| {
                info!("Loading native agent library `{}`", self.library);
                let module = (self.open)().inspect_err(|e| {
                    error!("{}", e);
                })?;
                module.static_setup().inspect_err(|e| {
                    error!("Static setup of `{}` failed: {}", self.library, e);
                })?;
                info!("Native agent library `{}` ready", module.library_name());
                Ok(Arc::new(module))
            })
            .clone()
    }

    pub fn status(&self) -> LoaderStatus {
        match self.module.get() {
            None => LoaderStatus::Unloaded,
            Some(Ok(_)) => LoaderStatus::Loaded,
            Some(Err(_)) => LoaderStatus::Failed,
        }
    }

    pub fn library(&self) -> &str {
        &self.library
    }
}

impl<M: NativeModule> fmt::Debug for RuntimeLoader<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeLoader")
            .field("library", &self.library)
            .field("status", &self.status())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{FakeModule, Recorder};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn test_static_setup_runs_once() {
        let recorder = Recorder::default();
        let opens = Arc::new(AtomicUsize::new(0));
        let loader = {
            let recorder = recorder.clone();
            let opens = opens.clone();
            RuntimeLoader::new("fake_agent", move || {
                opens.fetch_add(1, Ordering::SeqCst);
                Ok(FakeModule::new(recorder.clone()))
            })
        };

        assert_eq!(loader.status(), LoaderStatus::Unloaded);
        for _ in 0..5 {
            loader.ensure_loaded().unwrap();
        }
        assert_eq!(loader.status(), LoaderStatus::Loaded);
        assert_eq!(opens.load(Ordering::SeqCst), 1);
        assert_eq!(recorder.static_setups(), 1);
    }

    #[test]
    fn test_concurrent_first_use_sets_up_once() {
        let recorder = Recorder::default();
        let loader = {
            let recorder = recorder.clone();
            Arc::new(RuntimeLoader::new("fake_agent", move || {
                thread::sleep(std::time::Duration::from_millis(20));
                Ok(FakeModule::new(recorder.clone()))
            }))
        };

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let loader = loader.clone();
                thread::spawn(move || loader.ensure_loaded().map(|_| ()))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap().unwrap();
        }
        assert_eq!(recorder.static_setups(), 1);
    }

    #[test]
    fn test_failed_load_is_permanent() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let loader: RuntimeLoader<FakeModule> = {
            let attempts = attempts.clone();
            RuntimeLoader::new("missing_agent", move || {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(BridgeError::LibraryLoad {
                    library: "missing_agent".into(),
                    search_path: "/nowhere".into(),
                    reason: "not found".into(),
                })
            })
        };

        let first = loader.ensure_loaded().unwrap_err();
        let second = loader.ensure_loaded().unwrap_err();
        assert!(first.is_fatal());
        assert_eq!(first.to_string(), second.to_string());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(loader.status(), LoaderStatus::Failed);
    }

    #[test]
    fn test_failed_static_setup_is_fatal() {
        let recorder = Recorder::default();
        recorder.fail_static_setup();
        let loader = {
            let recorder = recorder.clone();
            RuntimeLoader::new("fake_agent", move || Ok(FakeModule::new(recorder.clone())))
        };

        let err = loader.ensure_loaded().unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(loader.status(), LoaderStatus::Failed);
    }
}
