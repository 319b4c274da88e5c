//! Round lifecycle engine.
//!
//! Owns the append-only round history and drives each round through its
//! life: open, accepting stakes behind the admission gate, then settled in
//! one atomic step that pays winners and opens the successor.
//!
//! Two numeric mechanisms keep the pool solvent:
//! - the admission gate refuses any stake the pool could not later honor at
//!   the guaranteed minimum multiplier;
//! - the multiplier selector picks the highest payout ratio the current
//!   reserve sustains, bottoming out at the minimum without checking
//!   affordability — the settlement transfer is the final arbiter, and a
//!   failed transfer leaves the round open for a later retry.

use commonware_cryptography::ed25519::PublicKey;
use tenpool_types::{
    EngineError, Round, Stake, MAX_MULTIPLIER, MAX_ROUND_STAKES, MIN_MULTIPLIER, NUMBER_COUNT,
};
use tracing::{debug, info};

use crate::treasury::{Payout, Treasury};

/// Pick the highest multiplier the reserve sustains for `criterion`.
///
/// Decreases from [`MAX_MULTIPLIER`], stopping at the first multiplier whose
/// product with `criterion` is strictly below `reserve`, or at
/// [`MIN_MULTIPLIER`]. Never checks whether the minimum is itself payable.
pub fn select_multiplier(criterion: u64, reserve: u64) -> u64 {
    let mut multiplier = MAX_MULTIPLIER;
    while multiplier > MIN_MULTIPLIER
        && (criterion as u128) * (multiplier as u128) >= reserve as u128
    {
        multiplier -= 1;
    }
    multiplier
}

/// Summary of a settled round.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settlement {
    pub round: u64,
    pub winning_number: u8,
    pub multiplier: u64,
    pub winners: usize,
    pub total_paid: u64,
}

/// The round lifecycle controller.
///
/// Holds the full round history (the last entry is always the open round)
/// and the host treasury. All mutation goes through `&mut self`; wrap the
/// engine in an [`Actor`](crate::Actor) when multiple tasks need access.
pub struct Engine<T: Treasury> {
    rounds: Vec<Round>,
    treasury: T,
}

impl<T: Treasury> Engine<T> {
    /// Start a fresh engine with round 0 open.
    pub fn new(treasury: T) -> Self {
        Self {
            rounds: vec![Round::new(0)],
            treasury,
        }
    }

    /// Rebuild an engine from persisted history.
    ///
    /// The history must be contiguous from round 0, internally consistent,
    /// and end with exactly one open round.
    pub fn restore(rounds: Vec<Round>, treasury: T) -> Result<Self, EngineError> {
        if rounds.is_empty() {
            return Err(EngineError::CorruptHistory("empty history"));
        }
        let last = rounds.len() - 1;
        for (i, round) in rounds.iter().enumerate() {
            if round.index != i as u64 {
                return Err(EngineError::CorruptHistory("non-contiguous round indices"));
            }
            if round.is_open() != (i == last) {
                return Err(EngineError::CorruptHistory(
                    "exactly the last round must be open",
                ));
            }
            if round.validate_invariants().is_err() {
                return Err(EngineError::CorruptHistory("round ledger inconsistent"));
            }
        }
        Ok(Self { rounds, treasury })
    }

    fn active_index(&self) -> u64 {
        (self.rounds.len() - 1) as u64
    }

    fn active(&self) -> &Round {
        // `rounds` is never empty: established by `new`/`restore`, preserved
        // by `close_round` (pushes the successor before returning).
        self.rounds.last().expect("one round is always open")
    }

    /// The currently open round.
    pub fn active_round(&self) -> &Round {
        self.active()
    }

    /// Any round in the history, open or settled.
    pub fn round(&self, index: u64) -> Result<&Round, EngineError> {
        self.rounds
            .get(index as usize)
            .ok_or(EngineError::UnknownRound { requested: index })
    }

    /// The full round history, oldest first.
    pub fn rounds(&self) -> &[Round] {
        &self.rounds
    }

    /// Current pool reserve, as reported by the treasury.
    pub fn reserve(&self) -> u64 {
        self.treasury.reserve()
    }

    pub fn treasury(&self) -> &T {
        &self.treasury
    }

    pub fn treasury_mut(&mut self) -> &mut T {
        &mut self.treasury
    }

    /// Worst-case payout commitment if `amount` were admitted: the heaviest
    /// number's total plus the incoming amount, at the guaranteed minimum.
    fn admission_required(round: &Round, amount: u64) -> u128 {
        ((round.max_per_number_total() as u128) + (amount as u128)) * (MIN_MULTIPLIER as u128)
    }

    /// Whether the pool could honor `amount` staked on the active round.
    ///
    /// Conservative: uses the heaviest per-number total regardless of which
    /// number the stake would target, and the reserve before the stake is
    /// deposited. Over-rejection is acceptable; under-rejection is not.
    pub fn can_admit(&self, round_id: u64, amount: u64) -> bool {
        round_id == self.active_index()
            && (self.treasury.reserve() as u128)
                >= Self::admission_required(self.active(), amount)
    }

    /// Admit a stake on the active round.
    ///
    /// Validation and the admission gate run before any funds move, so a
    /// rejected stake leaves every piece of state untouched. On admission the
    /// stake amount is deposited into the pool reserve and recorded.
    pub fn stake(
        &mut self,
        round_id: u64,
        number: u8,
        amount: u64,
        participant: PublicKey,
    ) -> Result<(), EngineError> {
        let active = self.active_index();
        if round_id != active {
            return Err(EngineError::RoundNotActive {
                requested: round_id,
                active,
            });
        }
        let round = self.active();
        if number as usize >= NUMBER_COUNT {
            return Err(EngineError::NumberOutOfRange {
                number,
                max: (NUMBER_COUNT - 1) as u8,
            });
        }
        if amount == 0 {
            return Err(EngineError::ZeroStake);
        }
        if round.participant_count() >= MAX_ROUND_STAKES {
            return Err(EngineError::RoundFull {
                max: MAX_ROUND_STAKES,
            });
        }
        if round.contains_participant(&participant) {
            return Err(EngineError::DuplicateStake);
        }
        let required = Self::admission_required(round, amount);
        let reserve = self.treasury.reserve();
        if (reserve as u128) < required {
            return Err(EngineError::AdmissionDenied { required, reserve });
        }

        // Funds first: the deposit is atomic, and the ledger update below
        // cannot fail after the checks above.
        self.treasury.deposit(&participant, amount)?;
        let round = self
            .rounds
            .last_mut()
            .expect("one round is always open");
        round.record_stake(Stake {
            participant,
            number,
            amount,
        })?;
        debug!(round = round_id, number, amount, "stake admitted");
        Ok(())
    }

    /// Settle the active round against `winning_number`.
    ///
    /// Pays every stake on the winning number at the selected multiplier, in
    /// staking order, as one all-or-nothing treasury batch. Only after the
    /// batch succeeds is the round marked settled and its successor opened.
    /// On a reserve shortfall the round stays open and unsettled; the caller
    /// may retry after topping up the reserve ([`Treasury::fund`]).
    ///
    /// The winning number is a trusted input; any access control over who
    /// may close a round belongs to the host.
    pub fn close_round(
        &mut self,
        round_id: u64,
        winning_number: u8,
    ) -> Result<Settlement, EngineError> {
        let active = self.active_index();
        if round_id != active {
            return Err(EngineError::RoundNotActive {
                requested: round_id,
                active,
            });
        }
        if winning_number as usize >= NUMBER_COUNT {
            return Err(EngineError::NumberOutOfRange {
                number: winning_number,
                max: (NUMBER_COUNT - 1) as u8,
            });
        }

        let round = self.active();
        let criterion = round.total_on(winning_number);
        let multiplier = select_multiplier(criterion, self.treasury.reserve());
        let payouts: Vec<Payout> = round
            .stakes_on(winning_number)
            .map(|stake| Payout {
                to: stake.participant.clone(),
                amount: stake.amount.saturating_mul(multiplier),
            })
            .collect();
        let winners = payouts.len();
        let total_paid = payouts
            .iter()
            .fold(0u64, |acc, p| acc.saturating_add(p.amount));

        // The atomic commit point: a failed batch moves no funds and the
        // round below is left untouched.
        self.treasury.apply(payouts)?;

        let round = self
            .rounds
            .last_mut()
            .expect("one round is always open");
        round.winning_number = Some(winning_number);
        self.rounds.push(Round::new(active + 1));
        info!(
            round = round_id,
            winning_number, multiplier, winners, total_paid, "round settled"
        );
        Ok(Settlement {
            round: round_id,
            winning_number,
            multiplier,
            winners,
            total_paid,
        })
    }

    // Reporting accessors. All side-effect-free; the per-round ones accept
    // settled rounds as well as the active one.

    pub fn participant_count(&self, round_id: u64) -> Result<usize, EngineError> {
        Ok(self.round(round_id)?.participant_count())
    }

    pub fn total_staked(&self, round_id: u64) -> Result<u64, EngineError> {
        Ok(self.round(round_id)?.total_staked)
    }

    pub fn participants_on(
        &self,
        round_id: u64,
        number: u8,
    ) -> Result<Vec<PublicKey>, EngineError> {
        if number as usize >= NUMBER_COUNT {
            return Err(EngineError::NumberOutOfRange {
                number,
                max: (NUMBER_COUNT - 1) as u8,
            });
        }
        Ok(self.round(round_id)?.participants_on(number))
    }

    pub fn max_per_number_total(&self, round_id: u64) -> Result<u64, EngineError> {
        Ok(self.round(round_id)?.max_per_number_total())
    }

    pub fn min_per_number_total(&self, round_id: u64) -> Result<u64, EngineError> {
        Ok(self.round(round_id)?.min_per_number_total())
    }

    /// How much more could be staked on the round's heaviest number before
    /// the admission gate starts rejecting (zero when the reserve is already
    /// below the committed worst case).
    pub fn available_quota(&self, round_id: u64) -> Result<u64, EngineError> {
        let committed =
            (self.round(round_id)?.max_per_number_total() as u128) * (MIN_MULTIPLIER as u128);
        let headroom = (self.treasury.reserve() as u128).saturating_sub(committed);
        Ok((headroom / MIN_MULTIPLIER as u128) as u64)
    }

    pub fn min_multiplier(&self) -> u64 {
        MIN_MULTIPLIER
    }

    pub fn max_multiplier(&self) -> u64 {
        MAX_MULTIPLIER
    }

    /// Advisory: the multiplier settlement would use if `number` were
    /// declared the winner of the active round right now.
    pub fn winner_multiplier(&self, number: u8) -> Result<u64, EngineError> {
        if number as usize >= NUMBER_COUNT {
            return Err(EngineError::NumberOutOfRange {
                number,
                max: (NUMBER_COUNT - 1) as u8,
            });
        }
        Ok(select_multiplier(
            self.active().total_on(number),
            self.treasury.reserve(),
        ))
    }

    /// Advisory lower bound: the multiplier the most constrained settlement
    /// (winning number = heaviest number) would use right now.
    pub fn lowest_achievable_multiplier(&self) -> u64 {
        select_multiplier(self.active().max_per_number_total(), self.treasury.reserve())
    }

    /// Advisory upper bound: the multiplier the least constrained settlement
    /// (winning number = lightest number) would use right now.
    pub fn highest_achievable_multiplier(&self) -> u64 {
        select_multiplier(self.active().min_per_number_total(), self.treasury.reserve())
    }
}
