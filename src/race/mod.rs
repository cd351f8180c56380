//! Multi-endpoint racing transport
//!
//! Every operation fans out to all endpoints of an [`EndpointSet`] and
//! joins on the first qualifying answer:
//! - `probe`: latency probe, fastest endpoint becomes the primary read connection
//! - `broadcast`: first endpoint to accept a signed transaction wins
//! - `confirm`: first endpoint to return a receipt wins, polled until a deadline
//!
//! Losing requests are detached, never awaited. Submissions and receipt
//! reads are idempotent on the network side so letting them run out is safe.

mod broadcast;
mod confirm;
mod probe;
mod types;

pub use broadcast::BroadcastRacer;
pub use confirm::ConfirmationRacer;
pub use probe::{select_fastest, EndpointProbe, ProbeReport, ProbeResult};
pub use types::{EndpointSet, EndpointUnreachable, RaceError, SubmissionOutcome};
