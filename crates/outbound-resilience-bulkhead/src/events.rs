use crate::error::LimiterError;
use outbound_resilience_core::ResilienceEvent;
use std::time::Instant;

/// Events emitted by a [`ConcurrencyLimiter`](crate::ConcurrencyLimiter).
#[derive(Debug, Clone)]
pub enum LimiterEvent {
    /// A permit was granted.
    CallPermitted {
        pattern_name: String,
        timestamp: Instant,
        concurrent_calls: usize,
    },
    /// `acquire` returned without a permit.
    CallRejected {
        pattern_name: String,
        timestamp: Instant,
        error: LimiterError,
    },
    /// A permit was released.
    PermitReleased {
        pattern_name: String,
        timestamp: Instant,
    },
}

impl ResilienceEvent for LimiterEvent {
    fn event_type(&self) -> &'static str {
        match self {
            LimiterEvent::CallPermitted { .. } => "call_permitted",
            LimiterEvent::CallRejected { .. } => "call_rejected",
            LimiterEvent::PermitReleased { .. } => "permit_released",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            LimiterEvent::CallPermitted { timestamp, .. }
            | LimiterEvent::CallRejected { timestamp, .. }
            | LimiterEvent::PermitReleased { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            LimiterEvent::CallPermitted { pattern_name, .. }
            | LimiterEvent::CallRejected { pattern_name, .. }
            | LimiterEvent::PermitReleased { pattern_name, .. } => pattern_name,
        }
    }
}
