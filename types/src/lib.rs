//! Common types used throughout tenpool.
//!
//! The round ledger ([`Round`], [`Stake`]), engine constants, and the error
//! taxonomy ([`EngineError`], [`TransferError`]) shared by the engine and
//! its hosts. Rounds carry `commonware-codec` implementations with
//! validating decode so persisted history can be restored safely.

mod constants;
mod error;
mod round;

pub use constants::{MAX_MULTIPLIER, MAX_ROUND_STAKES, MIN_MULTIPLIER, NUMBER_COUNT};
pub use error::{EngineError, TransferError};
pub use round::{Round, RoundInvariantError, Stake};

#[cfg(test)]
mod tests;
