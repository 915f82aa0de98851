//! Engine lifecycle.
//!
//! One explicit lifecycle object threaded through the dispatcher and the
//! workers; every participant reads the same atomic. There are no
//! process-wide flags.

use std::sync::atomic::{AtomicU8, Ordering};

/// The engine's lifecycle state.
///
/// Transitions only move forward: `Init -> Running -> Draining -> Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EngineState {
    /// Constructed, workers not yet started.
    Init = 0,
    /// Accepting and matching intents.
    Running = 1,
    /// No new ingress; queued intents are being finished.
    Draining = 2,
    /// All workers exited.
    Stopped = 3,
}

impl EngineState {
    fn from_u8(raw: u8) -> EngineState {
        match raw {
            0 => EngineState::Init,
            1 => EngineState::Running,
            2 => EngineState::Draining,
            _ => EngineState::Stopped,
        }
    }
}

/// Shared, atomically readable lifecycle state.
#[derive(Debug)]
pub struct Lifecycle {
    state: AtomicU8,
}

impl Lifecycle {
    /// Create a lifecycle in `Init`.
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(EngineState::Init as u8),
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> EngineState {
        EngineState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Whether new ingress is currently admitted.
    #[must_use]
    pub fn is_accepting(&self) -> bool {
        matches!(self.state(), EngineState::Init | EngineState::Running)
    }

    /// Advance to a later state. Backward transitions are ignored, so
    /// concurrent shutdown requests are harmless.
    pub fn advance(&self, to: EngineState) -> bool {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            if current >= to as u8 {
                return false;
            }
            match self.state.compare_exchange_weak(
                current,
                to as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(observed) => current = observed,
            }
        }
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_transitions_only() {
        let lifecycle = Lifecycle::new();
        assert_eq!(lifecycle.state(), EngineState::Init);
        assert!(lifecycle.advance(EngineState::Running));
        assert!(lifecycle.advance(EngineState::Draining));
        assert!(!lifecycle.advance(EngineState::Running));
        assert!(lifecycle.advance(EngineState::Stopped));
        assert_eq!(lifecycle.state(), EngineState::Stopped);
    }

    #[test]
    fn test_accepting_states() {
        let lifecycle = Lifecycle::new();
        assert!(lifecycle.is_accepting());
        lifecycle.advance(EngineState::Running);
        assert!(lifecycle.is_accepting());
        lifecycle.advance(EngineState::Draining);
        assert!(!lifecycle.is_accepting());
    }
}
