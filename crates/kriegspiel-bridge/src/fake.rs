//! Recording test double for the native side

use kriegspiel_core::{
    BridgeError, DecisionBudget, GameDescriptor, Move, NativeOperation, PlayerIndex, Result,
    StateSnapshot,
};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::adapter::{NativeAgent, NativeModule};

/// Arguments seen by one `call_select`
#[derive(Debug, Clone, PartialEq)]
pub struct SelectCall {
    pub own_message: String,
    pub referee_message: String,
    pub budget: DecisionBudget,
    pub state_mover: u32,
}

#[derive(Debug, Default)]
struct Calls {
    static_setups: usize,
    inits: Vec<PlayerIndex>,
    selects: Vec<SelectCall>,
    closes: usize,
    supports: usize,
    fail_static_setup: bool,
    fail_next: Option<NativeOperation>,
    select_delay: Option<Duration>,
    supports_answer: Option<bool>,
}

/// Shared log of native calls, cloned into every fake
#[derive(Debug, Clone, Default)]
pub struct Recorder(Arc<Mutex<Calls>>);

impl Recorder {
    fn calls(&self) -> MutexGuard<'_, Calls> {
        self.0.lock().unwrap()
    }

    pub fn static_setups(&self) -> usize {
        self.calls().static_setups
    }

    pub fn inits(&self) -> Vec<PlayerIndex> {
        self.calls().inits.clone()
    }

    pub fn selects(&self) -> Vec<SelectCall> {
        self.calls().selects.clone()
    }

    pub fn closes(&self) -> usize {
        self.calls().closes
    }

    pub fn supports_queries(&self) -> usize {
        self.calls().supports
    }

    pub fn fail_static_setup(&self) {
        self.calls().fail_static_setup = true;
    }

    /// Make the next call of `operation` raise a native fault
    pub fn fail_next(&self, operation: NativeOperation) {
        self.calls().fail_next = Some(operation);
    }

    /// Sleep this long inside every select, ignoring the budget
    pub fn set_select_delay(&self, delay: Duration) {
        self.calls().select_delay = Some(delay);
    }

    pub fn set_supports(&self, answer: bool) {
        self.calls().supports_answer = Some(answer);
    }

    fn take_fault(&self, operation: NativeOperation) -> Result<()> {
        let mut calls = self.calls();
        if calls.fail_next == Some(operation) {
            calls.fail_next = None;
            return Err(BridgeError::native(operation, "injected fault"));
        }
        Ok(())
    }
}

/// Fake module handing out [`FakeAgent`]s
#[derive(Debug)]
pub struct FakeModule {
    recorder: Recorder,
}

impl FakeModule {
    pub fn new(recorder: Recorder) -> Self {
        Self { recorder }
    }
}

impl NativeModule for FakeModule {
    type Agent = FakeAgent;

    fn library_name(&self) -> &str {
        "fake_agent"
    }

    fn static_setup(&self) -> Result<()> {
        let mut calls = self.recorder.calls();
        calls.static_setups += 1;
        if calls.fail_static_setup {
            return Err(BridgeError::native(
                NativeOperation::StaticSetup,
                "injected fault",
            ));
        }
        Ok(())
    }

    fn new_agent(module: &Arc<Self>) -> FakeAgent {
        FakeAgent::new(module.recorder.clone())
    }
}

/// Fake per-match adapter returning the first legal move
#[derive(Debug)]
pub struct FakeAgent {
    recorder: Recorder,
}

impl FakeAgent {
    pub fn new(recorder: Recorder) -> Self {
        Self { recorder }
    }
}

impl NativeAgent for FakeAgent {
    fn call_init(&mut self, _game: &GameDescriptor, player: PlayerIndex) -> Result<()> {
        self.recorder.take_fault(NativeOperation::Init)?;
        self.recorder.calls().inits.push(player);
        Ok(())
    }

    fn call_select(
        &mut self,
        _game: &GameDescriptor,
        state: &StateSnapshot,
        budget: &DecisionBudget,
        own_message: &str,
        referee_message: &str,
    ) -> Result<Move> {
        self.recorder.take_fault(NativeOperation::Select)?;
        let delay = {
            let mut calls = self.recorder.calls();
            calls.selects.push(SelectCall {
                own_message: own_message.to_owned(),
                referee_message: referee_message.to_owned(),
                budget: *budget,
                state_mover: state.mover,
            });
            calls.select_delay
        };
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        state
            .legal_moves
            .first()
            .cloned()
            .ok_or_else(|| BridgeError::native(NativeOperation::Select, "no legal moves"))
    }

    fn call_close(&mut self) -> Result<()> {
        self.recorder.calls().closes += 1;
        self.recorder.take_fault(NativeOperation::Close)
    }

    fn call_supports(&self, game: &GameDescriptor) -> Result<bool> {
        self.recorder.take_fault(NativeOperation::SupportsGame)?;
        let mut calls = self.recorder.calls();
        calls.supports += 1;
        Ok(calls
            .supports_answer
            .unwrap_or_else(|| game.is_kriegspiel_family()))
    }
}
