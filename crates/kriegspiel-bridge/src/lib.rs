//! # kriegspiel-bridge
//!
//! Host-side bridge that delegates Kriegspiel move selection to a separately
//! compiled native agent.
//!
//! This crate provides:
//! - `RuntimeLoader`: one-time library load and static setup
//! - `NativeAgent`/`NativeModule`: the native call surface, with a
//!   `libloading`-backed implementation speaking the C ABI
//! - `KriegspielAgent`: the per-match lifecycle state machine
//! - `AgentRegistry`: selectable agents by name and capability
//! - `select_with_watchdog`: deadline enforcement for hosts that need it

pub mod adapter;
pub mod config;
pub mod library;
pub mod lifecycle;
pub mod loader;
pub mod registry;
pub mod watchdog;

#[cfg(test)]
mod fake;

pub use adapter::{NativeAgent, NativeModule};
pub use config::BridgeConfig;
pub use library::{LibraryAgent, NativeApi, NativeLibrary};
pub use lifecycle::{KriegspielAgent, LifecycleState};
pub use loader::{LoaderStatus, RuntimeLoader};
pub use registry::{AgentRegistry, RegistryError, register_or_warn};
pub use watchdog::select_with_watchdog;

use kriegspiel_core::{Agent, Result};
use std::ops::Deref;
use std::sync::{Arc, OnceLock};
use tracing::warn;

/// Lifecycle instance backed by a dynamically loaded library
pub type NativeKriegspielAgent = KriegspielAgent<LibraryAgent>;

static SHARED_LOADER: OnceLock<RuntimeLoader<NativeLibrary>> = OnceLock::new();

/// Process-wide loader; the first configuration seen decides the library
pub fn shared_loader(config: &BridgeConfig) -> &'static RuntimeLoader<NativeLibrary> {
    let loader = SHARED_LOADER.get_or_init(|| {
        let config = config.clone();
        RuntimeLoader::new(config.library_name.clone(), move || {
            NativeLibrary::open(&config)
        })
    });
    if loader.library() != config.library_name {
        warn!(
            "Native loader already bound to `{}`; ignoring request for `{}`",
            loader.library(),
            config.library_name
        );
    }
    loader
}

/// Load the configured library and run its static setup, once per process
pub fn ensure_loaded(config: &BridgeConfig) -> Result<Arc<NativeLibrary>> {
    shared_loader(config).ensure_loaded()
}

/// Fresh lifecycle instance from a loader, loading on first use
pub fn new_agent<M, L>(loader: &L, name: &str) -> Result<KriegspielAgent<M::Agent>>
where
    M: NativeModule,
    L: Deref<Target = RuntimeLoader<M>>,
{
    let module = loader.ensure_loaded()?;
    Ok(KriegspielAgent::new(name, M::new_agent(&module)))
}

/// Register a loader-backed agent under `name`.
///
/// The capability predicate asks a throwaway instance, so it never touches
/// a live match. Load failures make the predicate answer `false`.
pub fn register_agent<M, L>(registry: &mut AgentRegistry, name: &str, loader: L) -> bool
where
    M: NativeModule,
    L: Deref<Target = RuntimeLoader<M>> + Clone + Send + Sync + 'static,
{
    let factory_loader = loader.clone();
    let factory_name = name.to_owned();
    let supports_name = name.to_owned();

    register_or_warn(
        registry,
        name,
        move || Ok(Box::new(new_agent(&factory_loader, &factory_name)?) as Box<dyn Agent>),
        move |game| {
            match new_agent(&loader, &supports_name).and_then(|agent| agent.supports_game(game)) {
                Ok(supported) => supported,
                Err(e) => {
                    warn!("{} cannot answer for {}: {}", supports_name, game.name, e);
                    false
                }
            }
        },
    )
}

/// Register the configured native library with the process-wide loader
pub fn register_native_agent(registry: &mut AgentRegistry, config: &BridgeConfig) -> bool {
    register_agent(registry, &config.display_name, shared_loader(config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{FakeModule, Recorder};
    use kriegspiel_core::GameDescriptor;

    fn fake_loader(recorder: &Recorder) -> Arc<RuntimeLoader<FakeModule>> {
        let recorder = recorder.clone();
        Arc::new(RuntimeLoader::new("fake_agent", move || {
            Ok(FakeModule::new(recorder.clone()))
        }))
    }

    #[test]
    fn test_registered_agent_loads_once() {
        let recorder = Recorder::default();
        let loader = fake_loader(&recorder);
        let mut registry = AgentRegistry::new();

        assert!(register_agent(&mut registry, "Fake Native", loader.clone()));
        assert_eq!(loader.status(), LoaderStatus::Unloaded);

        let game = GameDescriptor::kriegspiel();
        assert_eq!(registry.agents_for(&game), vec!["Fake Native"]);
        let mut agent = registry.create("Fake Native").unwrap();
        agent.init_ai(&game, 1).unwrap();
        agent.close_ai().unwrap();
        registry.create("Fake Native").unwrap();

        assert_eq!(recorder.static_setups(), 1);
        assert_eq!(loader.status(), LoaderStatus::Loaded);
    }

    #[test]
    fn test_duplicate_registration_is_a_warning() {
        let recorder = Recorder::default();
        let loader = fake_loader(&recorder);
        let mut registry = AgentRegistry::new();

        assert!(register_agent(&mut registry, "Fake Native", loader.clone()));
        assert!(!register_agent(&mut registry, "Fake Native", loader));
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn test_unloadable_agent_supports_nothing() {
        let loader: Arc<RuntimeLoader<FakeModule>> = Arc::new(RuntimeLoader::new("gone", || {
            Err(kriegspiel_core::BridgeError::LibraryLoad {
                library: "gone".into(),
                search_path: "/nowhere".into(),
                reason: "not found".into(),
            })
        }));
        let mut registry = AgentRegistry::new();
        assert!(register_agent(&mut registry, "Gone", loader));

        assert!(registry.agents_for(&GameDescriptor::kriegspiel()).is_empty());
        assert!(matches!(
            registry.create("Gone"),
            Err(RegistryError::Agent(e)) if e.is_fatal()
        ));
    }
}
