use thiserror::Error;

/// Failure from the host's value-transfer primitive.
///
/// Transfers are atomic: an `Err` means no funds moved.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransferError {
    #[error("participant has insufficient funds (needed={needed}, available={available})")]
    InsufficientFunds { needed: u64, available: u64 },
    #[error("pool reserve cannot cover payouts (needed={needed}, reserve={reserve})")]
    InsufficientReserve { needed: u64, reserve: u64 },
}

/// Errors surfaced by engine operations.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("number out of range (number={number}, max={max})")]
    NumberOutOfRange { number: u8, max: u8 },
    #[error("stake amount must be greater than zero")]
    ZeroStake,
    #[error("participant already staked in this round")]
    DuplicateStake,
    #[error("round is full (max={max})")]
    RoundFull { max: usize },
    #[error("round already settled (round={round})")]
    RoundSettled { round: u64 },
    #[error("not the active round (requested={requested}, active={active})")]
    RoundNotActive { requested: u64, active: u64 },
    #[error("unknown round (requested={requested})")]
    UnknownRound { requested: u64 },
    #[error("stake would break the solvency bound (required={required}, reserve={reserve})")]
    AdmissionDenied { required: u128, reserve: u64 },
    #[error(transparent)]
    Transfer(#[from] TransferError),
    #[error("corrupt round history: {0}")]
    CorruptHistory(&'static str),
    #[error("engine service unavailable")]
    Unavailable,
}
