use parking_lot::Mutex;
use std::time::Instant;

use crate::errors::{DeskError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlightState {
    #[default]
    Idle,
    InFlight { op: &'static str, since: Instant },
}

/// Admits at most one model-calling operation at a time. A second `begin` while
/// a ticket is alive is rejected, never queued.
#[derive(Debug, Default)]
pub struct FlightGuard {
    state: Mutex<FlightState>,
}

/// Returns the guard to idle when dropped, whether the call succeeded, failed or was abandoned.
#[derive(Debug)]
pub struct FlightTicket<'a> {
    guard: &'a FlightGuard,
    op: &'static str,
}

impl FlightGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self, op: &'static str) -> Result<FlightTicket<'_>> {
        let mut state = self.state.lock();
        match *state {
            FlightState::InFlight { op: running, .. } => {
                tracing::debug!(requested = op, running, "rejecting concurrent request");
                Err(DeskError::ConcurrentRequest(format!("{op} requested while {running} is running")))
            }
            FlightState::Idle => {
                *state = FlightState::InFlight { op, since: Instant::now() };
                Ok(FlightTicket { guard: self, op })
            }
        }
    }

    pub fn state(&self) -> FlightState {
        *self.state.lock()
    }

    pub fn is_busy(&self) -> bool {
        matches!(self.state(), FlightState::InFlight { .. })
    }
}

impl FlightTicket<'_> {
    pub fn op(&self) -> &'static str {
        self.op
    }
}

impl Drop for FlightTicket<'_> {
    fn drop(&mut self) {
        *self.guard.state.lock() = FlightState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_begin_is_rejected_until_the_ticket_drops() {
        let guard = FlightGuard::new();
        let ticket = guard.begin("generate").unwrap();
        assert_eq!(ticket.op(), "generate");
        assert!(guard.is_busy());

        let err = guard.begin("revise").unwrap_err();
        assert!(err.is_busy());
        assert!(err.to_string().contains("revise requested while generate is running"));

        drop(ticket);
        assert_eq!(guard.state(), FlightState::Idle);
        assert!(guard.begin("revise").is_ok());
    }

    #[test]
    fn ticket_released_on_early_return() {
        fn failing(guard: &FlightGuard) -> Result<()> {
            let _ticket = guard.begin("seo")?;
            Err(DeskError::EmptyContent("generate SEO for".into()))
        }
        let guard = FlightGuard::new();
        assert!(failing(&guard).is_err());
        assert!(!guard.is_busy());
    }
}
