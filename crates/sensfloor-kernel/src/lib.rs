//! `sensfloor-kernel` – timing rules of the worker loop.
//!
//! It does not touch bytes; it decides when the worker should act.
//!
//! # Modules
//!
//! - [`staleness`] – [`StalenessScheduler`][staleness::StalenessScheduler]:
//!   finds tiles that reported high readings but went quiet and builds a
//!   poll request for each; [`PollCadence`][staleness::PollCadence] spaces the
//!   scans out over loop cycles.
//! - [`reconnect`] – [`ReconnectPolicy`][reconnect::ReconnectPolicy]:
//!   bounded open attempts with a fixed backoff.

pub mod reconnect;
pub mod staleness;

pub use reconnect::ReconnectPolicy;
pub use staleness::{PollCadence, StalenessScheduler};
