use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, Read, ReadExt, ReadRangeExt, Write};
use commonware_cryptography::ed25519::PublicKey;
use thiserror::Error;

use crate::{EngineError, MAX_ROUND_STAKES, NUMBER_COUNT};

/// One participant's bet of `amount` on `number` within a round.
///
/// Stakes are append-only history: once recorded they are never mutated
/// or removed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Stake {
    pub participant: PublicKey,
    pub number: u8,
    pub amount: u64,
}

impl Write for Stake {
    fn write(&self, writer: &mut impl BufMut) {
        self.participant.write(writer);
        self.number.write(writer);
        self.amount.write(writer);
    }
}

impl Read for Stake {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let participant = PublicKey::read(reader)?;
        let number = u8::read(reader)?;
        if number as usize >= NUMBER_COUNT {
            return Err(Error::Invalid("Stake", "number out of range"));
        }
        let amount = u64::read(reader)?;
        if amount == 0 {
            return Err(Error::Invalid("Stake", "zero amount"));
        }
        Ok(Self {
            participant,
            number,
            amount,
        })
    }
}

impl EncodeSize for Stake {
    fn encode_size(&self) -> usize {
        self.participant.encode_size() + self.number.encode_size() + self.amount.encode_size()
    }
}

/// A round's ledger failed a consistency check.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RoundInvariantError {
    #[error("round total does not match per-number totals (total={total}, sum={sum})")]
    TotalMismatch { total: u64, sum: u64 },
    #[error("per-number tally diverges from stake list (number={number}, tallied={tallied}, actual={actual})")]
    TallyMismatch { number: u8, tallied: u64, actual: u64 },
    #[error("participant staked more than once")]
    DuplicateParticipant,
    #[error("winning number out of range (number={number})")]
    WinningNumberOutOfRange { number: u8 },
}

/// One betting cycle, from opening through settlement.
///
/// The insertion-ordered `stakes` list is the source of truth; the
/// per-number tallies and the round total are maintained incrementally so
/// solvency checks are a fixed-size scan instead of a walk over every
/// stake. The tallies are derived state and are rebuilt (and verified)
/// when a round is decoded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Round {
    /// Position in the engine's history (0-based, contiguous).
    pub index: u64,
    /// Sum of all stake amounts in this round.
    pub total_staked: u64,
    /// Every admitted stake, in staking order.
    pub stakes: Vec<Stake>,
    /// Amount staked on each number.
    pub totals_by_number: [u64; NUMBER_COUNT],
    /// Set exactly once, at settlement. `None` while the round is open.
    pub winning_number: Option<u8>,
}

impl Round {
    /// Open a fresh round at `index`.
    pub fn new(index: u64) -> Self {
        Self {
            index,
            total_staked: 0,
            stakes: Vec::new(),
            totals_by_number: [0; NUMBER_COUNT],
            winning_number: None,
        }
    }

    /// Whether the round can still accept stakes.
    pub fn is_open(&self) -> bool {
        self.winning_number.is_none()
    }

    /// Record a stake, updating the tallies.
    ///
    /// Rejects, with no state change, stakes on settled rounds, out-of-range
    /// numbers, zero amounts, full rounds, and a second stake by a
    /// participant already in the round.
    pub fn record_stake(&mut self, stake: Stake) -> Result<(), EngineError> {
        if !self.is_open() {
            return Err(EngineError::RoundSettled { round: self.index });
        }
        if stake.number as usize >= NUMBER_COUNT {
            return Err(EngineError::NumberOutOfRange {
                number: stake.number,
                max: (NUMBER_COUNT - 1) as u8,
            });
        }
        if stake.amount == 0 {
            return Err(EngineError::ZeroStake);
        }
        if self.stakes.len() >= MAX_ROUND_STAKES {
            return Err(EngineError::RoundFull {
                max: MAX_ROUND_STAKES,
            });
        }
        if self.contains_participant(&stake.participant) {
            return Err(EngineError::DuplicateStake);
        }
        self.total_staked = self.total_staked.saturating_add(stake.amount);
        let tally = &mut self.totals_by_number[stake.number as usize];
        *tally = tally.saturating_add(stake.amount);
        self.stakes.push(stake);
        Ok(())
    }

    /// Whether `participant` already holds a stake in this round.
    pub fn contains_participant(&self, participant: &PublicKey) -> bool {
        self.stakes.iter().any(|s| s.participant == *participant)
    }

    pub fn participant_count(&self) -> usize {
        self.stakes.len()
    }

    /// Total staked on a single number (0 for out-of-range numbers).
    pub fn total_on(&self, number: u8) -> u64 {
        self.totals_by_number
            .get(number as usize)
            .copied()
            .unwrap_or(0)
    }

    /// Participants who chose `number`, in staking order.
    pub fn participants_on(&self, number: u8) -> Vec<PublicKey> {
        self.stakes
            .iter()
            .filter(|s| s.number == number)
            .map(|s| s.participant.clone())
            .collect()
    }

    /// Stakes on `number`, in staking order.
    pub fn stakes_on(&self, number: u8) -> impl Iterator<Item = &Stake> {
        self.stakes.iter().filter(move |s| s.number == number)
    }

    /// Largest per-number total (the worst-case payout base).
    pub fn max_per_number_total(&self) -> u64 {
        self.totals_by_number.iter().copied().max().unwrap_or(0)
    }

    /// Smallest per-number total.
    pub fn min_per_number_total(&self) -> u64 {
        self.totals_by_number.iter().copied().min().unwrap_or(0)
    }

    /// Verify the derived tallies against the stake list.
    pub fn validate_invariants(&self) -> Result<(), RoundInvariantError> {
        if let Some(number) = self.winning_number {
            if number as usize >= NUMBER_COUNT {
                return Err(RoundInvariantError::WinningNumberOutOfRange { number });
            }
        }
        let mut actual = [0u64; NUMBER_COUNT];
        for (i, stake) in self.stakes.iter().enumerate() {
            if self.stakes[..i]
                .iter()
                .any(|s| s.participant == stake.participant)
            {
                return Err(RoundInvariantError::DuplicateParticipant);
            }
            let tally = &mut actual[stake.number as usize];
            *tally = tally.saturating_add(stake.amount);
        }
        for (number, (&tallied, &computed)) in self
            .totals_by_number
            .iter()
            .zip(actual.iter())
            .enumerate()
        {
            if tallied != computed {
                return Err(RoundInvariantError::TallyMismatch {
                    number: number as u8,
                    tallied,
                    actual: computed,
                });
            }
        }
        let sum = actual.iter().fold(0u64, |acc, &t| acc.saturating_add(t));
        if sum != self.total_staked {
            return Err(RoundInvariantError::TotalMismatch {
                total: self.total_staked,
                sum,
            });
        }
        Ok(())
    }
}

impl Write for Round {
    fn write(&self, writer: &mut impl BufMut) {
        self.index.write(writer);
        self.winning_number.write(writer);
        self.stakes.write(writer);
    }
}

impl Read for Round {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let index = u64::read(reader)?;
        let winning_number = Option::<u8>::read(reader)?;
        if let Some(number) = winning_number {
            if number as usize >= NUMBER_COUNT {
                return Err(Error::Invalid("Round", "winning number out of range"));
            }
        }
        let stakes = Vec::<Stake>::read_range(reader, 0..=MAX_ROUND_STAKES)?;

        // Tallies are not encoded; rebuild them from the stake list.
        let mut total_staked = 0u64;
        let mut totals_by_number = [0u64; NUMBER_COUNT];
        for (i, stake) in stakes.iter().enumerate() {
            if stakes[..i]
                .iter()
                .any(|s| s.participant == stake.participant)
            {
                return Err(Error::Invalid("Round", "duplicate participant"));
            }
            total_staked = total_staked.saturating_add(stake.amount);
            let tally = &mut totals_by_number[stake.number as usize];
            *tally = tally.saturating_add(stake.amount);
        }

        Ok(Self {
            index,
            total_staked,
            stakes,
            totals_by_number,
            winning_number,
        })
    }
}

impl EncodeSize for Round {
    fn encode_size(&self) -> usize {
        self.index.encode_size() + self.winning_number.encode_size() + self.stakes.encode_size()
    }
}
