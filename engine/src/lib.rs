//! Deterministic round lifecycle engine for tenpool.
//!
//! Everything here is synchronous and deterministic: no clocks, no
//! randomness. The winning number is a trusted external input (e.g. a
//! verified randomness beacon); the engine only enforces that the pool can
//! honor what it admits.
//!
//! Entry points:
//! - [`Engine`]: the state object. Single-writer by construction (`&mut`).
//! - [`Actor`] / [`Mailbox`]: the async wrapper that serializes access for
//!   concurrent hosts.
//! - [`Treasury`]: the host-provided funds primitive the engine settles
//!   through. A [`Memory`] implementation ships behind the `mocks` feature.

mod actor;
mod engine;
mod ingress;
mod treasury;

pub use actor::Actor;
pub use engine::{select_multiplier, Engine, Settlement};
pub use ingress::{Mailbox, Message};
pub use treasury::{Payout, Treasury};

#[cfg(any(test, feature = "mocks"))]
pub use treasury::Memory;
