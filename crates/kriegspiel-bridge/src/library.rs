//! Native agent modules resolved through the C ABI
//!
//! A [`NativeLibrary`] is either opened from disk with `libloading` or built
//! from function pointers already linked into the process. Both go through
//! the same ABI version check and expose the same [`LibraryAgent`] adapter.

use kriegspiel_abi::{
    ABI_VERSION, AbiVersionFn, CloseFn, InitFn, LastErrorFn, OwnedGameView, OwnedStateView,
    SelectFn, StaticInitFn, SupportsGameFn, c_string, encode_limit, status, symbols,
};
use kriegspiel_core::{
    BridgeError, DecisionBudget, GameDescriptor, Misuse, Move, NativeOperation, PlayerIndex,
    Result, StateSnapshot,
};
use libloading::Library;
use std::ffi::{CStr, c_void};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::adapter::{NativeAgent, NativeModule};
use crate::config::{BridgeConfig, LIBRARY_PATH_ENV};

/// Entry points of a native agent
#[derive(Clone, Copy)]
pub struct NativeApi {
    pub abi_version: AbiVersionFn,
    pub static_init: StaticInitFn,
    pub init: InitFn,
    pub select: SelectFn,
    pub close: CloseFn,
    pub supports_game: SupportsGameFn,
    pub last_error: Option<LastErrorFn>,
}

impl NativeApi {
    /// Look up every export in `library`
    ///
    /// # Safety
    /// The exports must have the signatures declared in `kriegspiel_abi`.
    unsafe fn resolve(library: &Library, name: &str) -> Result<Self> {
        unsafe {
            Ok(Self {
                abi_version: symbol(library, name, symbols::ABI_VERSION)?,
                static_init: symbol(library, name, symbols::STATIC_INIT)?,
                init: symbol(library, name, symbols::INIT)?,
                select: symbol(library, name, symbols::SELECT)?,
                close: symbol(library, name, symbols::CLOSE)?,
                supports_game: symbol(library, name, symbols::SUPPORTS_GAME)?,
                last_error: symbol(library, name, symbols::LAST_ERROR).ok(),
            })
        }
    }
}

unsafe fn symbol<T: Copy>(library: &Library, name: &str, symbol: &[u8]) -> Result<T> {
    unsafe { library.get::<T>(symbol) }
        .map(|sym| *sym)
        .map_err(|_| BridgeError::MissingSymbol {
            library: name.to_owned(),
            symbol: symbols::display(symbol),
        })
}

/// A native agent module speaking the C ABI
pub struct NativeLibrary {
    name: String,
    location: String,
    api: NativeApi,
    // Keeps the code behind `api` mapped; must drop after everything else
    _library: Option<Library>,
}

impl NativeLibrary {
    /// Open the library named by `config` through the platform loader.
    ///
    /// The logical name gets the platform prefix and suffix
    /// (`libname.so`, `libname.dylib`, `name.dll`). Failure is fatal for
    /// this agent type and names both the library and the search path used.
    pub fn open(config: &BridgeConfig) -> Result<Self> {
        let file = libloading::library_filename(&config.library_name);
        let path = match &config.search_path {
            Some(dir) => dir.join(&file),
            None => PathBuf::from(&file),
        };
        let search_path = config.describe_search_path();
        debug!("Opening {:?} (search path: {})", path, search_path);

        // SAFETY: loading runs the library's initialisers; agent libraries are trusted code
        let library = unsafe { Library::new(&path) }.map_err(|e| {
            error!("Failed to load library: {}", config.library_name);
            error!("Library search path currently points to: {}", search_path);
            error!(
                "You can change this path with {} or the --lib-dir flag",
                LIBRARY_PATH_ENV
            );
            BridgeError::LibraryLoad {
                library: config.library_name.clone(),
                search_path: search_path.clone(),
                reason: e.to_string(),
            }
        })?;

        // SAFETY: symbol types come from the shared ABI crate
        let api = unsafe { NativeApi::resolve(&library, &config.library_name)? };
        Self::with_api(
            config.library_name.clone(),
            path.display().to_string(),
            api,
            Some(library),
        )
    }

    /// Wrap entry points that are already linked into this process
    pub fn linked(name: impl Into<String>, api: NativeApi) -> Result<Self> {
        Self::with_api(name.into(), "<linked>".into(), api, None)
    }

    fn with_api(
        name: String,
        location: String,
        api: NativeApi,
        library: Option<Library>,
    ) -> Result<Self> {
        // SAFETY: takes no arguments and has no preconditions
        let found = unsafe { (api.abi_version)() };
        if found != ABI_VERSION {
            return Err(BridgeError::AbiMismatch {
                library: name,
                expected: ABI_VERSION,
                found,
            });
        }
        debug!("Resolved `{}` from {} (ABI v{})", name, location, found);
        Ok(Self {
            name,
            location,
            api,
            _library: library,
        })
    }

    /// Where the code was loaded from
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Turn a non-OK status into a fault carrying the library's own message
    fn check(&self, operation: NativeOperation, code: i32) -> Result<()> {
        if code == status::OK {
            return Ok(());
        }
        let detail = self
            .api
            .last_error
            .map(|last_error| {
                // SAFETY: returns null or a string valid until the next call on this thread
                let ptr = unsafe { last_error() };
                if ptr.is_null() {
                    String::new()
                } else {
                    unsafe { CStr::from_ptr(ptr) }
                        .to_string_lossy()
                        .into_owned()
                }
            })
            .filter(|message| !message.is_empty());
        let message = match detail {
            Some(detail) => format!("{} (status {}): {}", status::describe(code), code, detail),
            None => format!("{} (status {})", status::describe(code), code),
        };
        Err(BridgeError::native(operation, message))
    }
}

impl fmt::Debug for NativeLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeLibrary")
            .field("name", &self.name)
            .field("location", &self.location)
            .finish()
    }
}

impl NativeModule for NativeLibrary {
    type Agent = LibraryAgent;

    fn library_name(&self) -> &str {
        &self.name
    }

    fn static_setup(&self) -> Result<()> {
        // SAFETY: called once, before any other export, by the loader
        let code = unsafe { (self.api.static_init)() };
        self.check(NativeOperation::StaticSetup, code)
    }

    fn new_agent(module: &Arc<Self>) -> LibraryAgent {
        LibraryAgent {
            module: module.clone(),
            instance: None,
        }
    }
}

/// Per-match instance pointer handed out by `kriegspiel_init`
struct Instance(*mut c_void);

// SAFETY: the ABI lets an instance be driven from any thread, one call at a time
unsafe impl Send for Instance {}

/// Per-match adapter marshaling calls into a [`NativeLibrary`]
pub struct LibraryAgent {
    module: Arc<NativeLibrary>,
    instance: Option<Instance>,
}

impl LibraryAgent {
    fn instance(&self) -> Result<*mut c_void> {
        self.instance
            .as_ref()
            .map(|instance| instance.0)
            .ok_or(BridgeError::Misuse(Misuse::NotInitialized))
    }
}

impl NativeAgent for LibraryAgent {
    fn call_init(&mut self, game: &GameDescriptor, player: PlayerIndex) -> Result<()> {
        if self.instance.is_some() {
            return Err(Misuse::AlreadyInitialized.into());
        }
        let game_view = OwnedGameView::new(game)?;
        let player = i32::try_from(player.get())
            .map_err(|_| BridgeError::Marshal(format!("player index {} overflows", player)))?;

        let mut out = std::ptr::null_mut();
        // SAFETY: the view outlives the call and `out` is a valid slot
        let code = unsafe { (self.module.api.init)(game_view.as_ptr(), player, &mut out) };
        self.module.check(NativeOperation::Init, code)?;
        self.instance = Some(Instance(out));
        Ok(())
    }

    fn call_select(
        &mut self,
        game: &GameDescriptor,
        state: &StateSnapshot,
        budget: &DecisionBudget,
        own_message: &str,
        referee_message: &str,
    ) -> Result<Move> {
        let instance = self.instance()?;
        let game_view = OwnedGameView::new(game)?;
        let state_view = OwnedStateView::new(state)?;
        let own = c_string(own_message, "own message")?;
        let referee = c_string(referee_message, "referee message")?;

        let mut chosen = usize::MAX;
        // SAFETY: every pointer is borrowed from a local that outlives the call
        let code = unsafe {
            (self.module.api.select)(
                instance,
                game_view.as_ptr(),
                state_view.as_ptr(),
                budget.max_seconds,
                encode_limit(budget.max_iterations),
                encode_limit(budget.max_depth),
                own.as_ptr(),
                referee.as_ptr(),
                &mut chosen,
            )
        };
        self.module.check(NativeOperation::Select, code)?;

        state.legal_moves.get(chosen).cloned().ok_or_else(|| {
            BridgeError::native(
                NativeOperation::Select,
                format!(
                    "agent chose move {} but only {} were offered",
                    chosen,
                    state.legal_moves.len()
                ),
            )
        })
    }

    fn call_close(&mut self) -> Result<()> {
        let Some(instance) = self.instance.take() else {
            return Ok(());
        };
        // SAFETY: the instance came from `init` and is released exactly once
        let code = unsafe { (self.module.api.close)(instance.0) };
        self.module.check(NativeOperation::Close, code)
    }

    fn call_supports(&self, game: &GameDescriptor) -> Result<bool> {
        let game_view = OwnedGameView::new(game)?;
        // SAFETY: the view outlives the call
        let code = unsafe { (self.module.api.supports_game)(game_view.as_ptr()) };
        if code < 0 {
            self.module.check(NativeOperation::SupportsGame, code)?;
        }
        Ok(code > 0)
    }
}

impl Drop for LibraryAgent {
    fn drop(&mut self) {
        if self.instance.is_some() {
            warn!(
                "Native instance from `{}` dropped without close; releasing it",
                self.module.name
            );
            if let Err(e) = self.call_close() {
                warn!("Releasing native instance failed: {}", e);
            }
        }
    }
}
