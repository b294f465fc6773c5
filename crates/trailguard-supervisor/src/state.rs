//! Supervisor lifecycle state.

use rust_decimal::Decimal;
use trailguard_core::types::Side;
use trailguard_risk::TrailingStop;

/// Lifecycle phase of a supervised position.
///
/// `Closed` and `Failed` are terminal; there are no transitions out of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    Monitoring,
    Closing,
    Closed,
    Failed,
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Closed | Phase::Failed)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::Init => "INIT",
            Phase::Monitoring => "MONITORING",
            Phase::Closing => "CLOSING",
            Phase::Closed => "CLOSED",
            Phase::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// Mutable state of one supervisor run.
///
/// Owned by a single task; the ratchet inside is the only place `best_price`
/// lives, so monotonicity holds by construction.
#[derive(Debug)]
pub struct SupervisorState {
    phase: Phase,
    ratchet: TrailingStop,
    close_begun: bool,
}

impl SupervisorState {
    pub fn new(entry_price: Decimal, side: Side, threshold_pct: Decimal) -> Self {
        Self {
            phase: Phase::Init,
            ratchet: TrailingStop::new(entry_price, side, threshold_pct),
            close_begun: false,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn ratchet(&self) -> &TrailingStop {
        &self.ratchet
    }

    pub fn ratchet_mut(&mut self) -> &mut TrailingStop {
        &mut self.ratchet
    }

    pub fn begin_monitoring(&mut self) {
        self.phase = Phase::Monitoring;
    }

    /// Claim the MONITORING -> CLOSING transition.
    ///
    /// Returns `true` exactly once; duplicate trigger evaluations observe
    /// `false` and must not submit a second closing order.
    pub fn try_begin_close(&mut self) -> bool {
        if self.close_begun {
            return false;
        }
        self.close_begun = true;
        self.phase = Phase::Closing;
        true
    }

    pub fn finish(&mut self, terminal: Phase) {
        debug_assert!(terminal.is_terminal());
        self.phase = terminal;
    }
}
