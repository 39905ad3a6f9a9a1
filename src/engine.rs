//! Boundary to the external duel rules core.
//!
//! The lobby never inspects the meaning of engine values: responses are
//! opaque tokens relayed between clients and the rules core, and
//! [`EngineSession::process`] only reports coarse progress. A real rules
//! core implements [`DuelEngine`]; the shipped binary wires [`NullEngine`].

/// Everything the rules core needs to start a match.
#[derive(Debug, Clone)]
pub struct DuelSetup {
    /// Two team rosters of one or two display names each.
    pub teams: [Vec<String>; 2],
    /// Starting lifepoints per team.
    pub lifepoints: [u32; 2],
    /// Packed option bits (rules variant, tag flag).
    pub options: u64,
}

/// Coarse progress reported by [`EngineSession::process`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineStatus {
    /// Nothing pending.
    Idle,
    /// The engine posed a query and awaits a response.
    Awaiting,
    /// The match has ended.
    Finished,
}

/// A running match inside the rules core.
pub trait EngineSession: Send {
    /// Answer the engine's pending query with a small integer.
    fn feed_response_int(&mut self, value: i64);

    /// Answer the engine's pending query with a raw byte buffer.
    fn feed_response_bytes(&mut self, value: &[u8]);

    /// Advance match state.
    fn process(&mut self) -> EngineStatus;

    /// Terminate the match.
    fn end(&mut self);
}

/// Factory for engine sessions.
pub trait DuelEngine: Send + Sync {
    fn start(&self, setup: DuelSetup) -> Box<dyn EngineSession>;
}

/// Stand-in wiring for builds without a linked rules core.
#[derive(Debug, Default)]
pub struct NullEngine;

impl DuelEngine for NullEngine {
    fn start(&self, _setup: DuelSetup) -> Box<dyn EngineSession> {
        Box::new(NullSession)
    }
}

struct NullSession;

impl EngineSession for NullSession {
    fn feed_response_int(&mut self, _value: i64) {}

    fn feed_response_bytes(&mut self, _value: &[u8]) {}

    fn process(&mut self) -> EngineStatus {
        EngineStatus::Idle
    }

    fn end(&mut self) {}
}
