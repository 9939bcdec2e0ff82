//! Deadline enforcement around a native decision
//!
//! The bridge itself only forwards the budget. Hosts that cannot afford to
//! block on a misbehaving agent run the decision here instead: it executes on
//! tokio's blocking pool and the caller gets `DeadlineExceeded` once
//! `max_seconds + grace` passes. The native call cannot be interrupted, so it
//! keeps running and the agent stays locked until it returns.

use kriegspiel_core::{
    Agent, BridgeError, DecisionBudget, GameDescriptor, Move, NativeOperation, Result,
    StateSnapshot,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task;
use tracing::warn;

/// Run `select_action` on the blocking pool, giving up after the budget
pub async fn select_with_watchdog<A>(
    agent: Arc<Mutex<A>>,
    game: Arc<GameDescriptor>,
    state: Arc<StateSnapshot>,
    budget: DecisionBudget,
    grace: Duration,
) -> Result<Move>
where
    A: Agent + ?Sized + 'static,
{
    budget.validate()?;

    let decision = task::spawn_blocking(move || {
        let mut agent = agent
            .lock()
            .map_err(|_| BridgeError::native(NativeOperation::Select, "agent lock poisoned"))?;
        agent.select_action(&game, &state, &budget)
    });

    let Some(deadline) = budget.time_limit().and_then(|limit| limit.checked_add(grace)) else {
        return join(decision.await);
    };

    match tokio::time::timeout(deadline, decision).await {
        Ok(joined) => join(joined),
        Err(_) => {
            warn!(
                "Native decision still running after {:?}; abandoning it",
                deadline
            );
            Err(BridgeError::DeadlineExceeded(deadline))
        }
    }
}

fn join(joined: std::result::Result<Result<Move>, task::JoinError>) -> Result<Move> {
    joined.map_err(|e| BridgeError::native(NativeOperation::Select, e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{FakeAgent, Recorder};
    use crate::lifecycle::KriegspielAgent;
    use std::time::Instant;

    fn initialized(recorder: &Recorder) -> Arc<Mutex<KriegspielAgent<FakeAgent>>> {
        let mut agent = KriegspielAgent::new("watched", FakeAgent::new(recorder.clone()));
        agent
            .initialize(&GameDescriptor::kriegspiel(), 1, 2)
            .unwrap();
        Arc::new(Mutex::new(agent))
    }

    fn position() -> Arc<StateSnapshot> {
        Arc::new(StateSnapshot {
            mover: 1,
            legal_moves: vec![Move::new(12, 28)],
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_watchdog_fires_near_budget() {
        let recorder = Recorder::default();
        recorder.set_select_delay(Duration::from_secs(1));
        let agent = initialized(&recorder);

        let started = Instant::now();
        let result = select_with_watchdog(
            agent,
            Arc::new(GameDescriptor::kriegspiel()),
            position(),
            DecisionBudget::seconds(0.1),
            Duration::from_millis(50),
        )
        .await;
        let elapsed = started.elapsed();

        assert!(matches!(result, Err(BridgeError::DeadlineExceeded(_))));
        assert!(elapsed >= Duration::from_millis(150));
        assert!(elapsed < Duration::from_millis(900), "{:?}", elapsed);
    }

    #[tokio::test]
    async fn test_watchdog_passes_prompt_decision_through() {
        let recorder = Recorder::default();
        let agent = initialized(&recorder);

        let chosen = select_with_watchdog(
            agent,
            Arc::new(GameDescriptor::kriegspiel()),
            position(),
            DecisionBudget::seconds(1.0),
            Duration::from_millis(50),
        )
        .await
        .unwrap();
        assert_eq!(chosen, Move::new(12, 28));
        assert_eq!(recorder.selects().len(), 1);
    }

    #[tokio::test]
    async fn test_watchdog_without_time_limit_waits() {
        let recorder = Recorder::default();
        recorder.set_select_delay(Duration::from_millis(100));
        let agent = initialized(&recorder);

        let chosen = select_with_watchdog(
            agent,
            Arc::new(GameDescriptor::kriegspiel()),
            position(),
            DecisionBudget::default().with_depth(3),
            Duration::ZERO,
        )
        .await
        .unwrap();
        assert_eq!(chosen, Move::new(12, 28));
    }

    #[tokio::test]
    async fn test_watchdog_treats_huge_budget_as_unlimited() {
        let recorder = Recorder::default();
        let agent = initialized(&recorder);

        let chosen = select_with_watchdog(
            agent,
            Arc::new(GameDescriptor::kriegspiel()),
            position(),
            DecisionBudget::seconds(1e20),
            Duration::from_millis(50),
        )
        .await
        .unwrap();
        assert_eq!(chosen, Move::new(12, 28));

        let agent = initialized(&recorder);
        let chosen = select_with_watchdog(
            agent,
            Arc::new(GameDescriptor::kriegspiel()),
            position(),
            DecisionBudget::seconds(1.0),
            Duration::MAX,
        )
        .await
        .unwrap();
        assert_eq!(chosen, Move::new(12, 28));
        assert_eq!(recorder.selects().len(), 2);
    }

    #[tokio::test]
    async fn test_watchdog_reports_misuse() {
        let recorder = Recorder::default();
        let agent = Arc::new(Mutex::new(KriegspielAgent::new(
            "fresh",
            FakeAgent::new(recorder),
        )));

        let err = select_with_watchdog(
            agent,
            Arc::new(GameDescriptor::kriegspiel()),
            position(),
            DecisionBudget::seconds(1.0),
            Duration::ZERO,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, BridgeError::Misuse(_)));
    }
}
