//! Candidate selection for payment routing.
//!
//! Every inbound deposit (payin) is routed to one collection endpoint and every outbound
//! settlement (payout) to one settlement agent. Both share a single engine that scores the
//! eligible pool, draws a candidate with score-weighted randomness, re-validates it against
//! live counters and falls back to the next draw when it is rejected.

pub mod config;
pub mod error;
pub mod routing;
pub mod telemetry;
