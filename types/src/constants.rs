/// How many numbers a stake may target (`0..NUMBER_COUNT`).
pub const NUMBER_COUNT: usize = 10;

/// Guaranteed payout multiplier. Admission reserves enough to pay the
/// heaviest-backed number at this ratio even in the worst case.
pub const MIN_MULTIPLIER: u64 = 2;

/// Highest payout multiplier the selector will attempt.
pub const MAX_MULTIPLIER: u64 = 5;

/// Maximum stakes a single round will accept (also the codec read bound).
pub const MAX_ROUND_STAKES: usize = 1024;
