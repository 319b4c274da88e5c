use commonware_cryptography::ed25519::PublicKey;
use tenpool_types::TransferError;

#[cfg(any(test, feature = "mocks"))]
use std::collections::HashMap;

/// A single pool-to-participant payment within a settlement batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Payout {
    pub to: PublicKey,
    pub amount: u64,
}

/// Host-provided funds primitive.
///
/// The engine never holds value itself; it asks the treasury to move it.
/// Every mutating method is atomic: on `Err` no funds have moved. The
/// settlement path leans on `apply` being all-or-nothing to leave a round
/// open and retryable when the reserve cannot cover a payout batch.
pub trait Treasury {
    /// Current pool reserve.
    fn reserve(&self) -> u64;

    /// Move `amount` from `from` into the pool reserve.
    fn deposit(&mut self, from: &PublicKey, amount: u64) -> Result<(), TransferError>;

    /// Top up the reserve from outside the engine (not tied to any stake).
    fn fund(&mut self, amount: u64);

    /// Pay every entry in `payouts` from the reserve, all-or-nothing.
    fn apply(&mut self, payouts: Vec<Payout>) -> Result<(), TransferError>;
}

/// In-memory treasury for tests.
#[cfg(any(test, feature = "mocks"))]
#[derive(Clone, Debug, Default)]
pub struct Memory {
    reserve: u64,
    balances: HashMap<PublicKey, u64>,
}

#[cfg(any(test, feature = "mocks"))]
impl Memory {
    pub fn new(reserve: u64) -> Self {
        Self {
            reserve,
            balances: HashMap::new(),
        }
    }

    /// Give a participant spendable funds.
    pub fn credit(&mut self, participant: &PublicKey, amount: u64) {
        let balance = self.balances.entry(participant.clone()).or_default();
        *balance = balance.saturating_add(amount);
    }

    pub fn balance(&self, participant: &PublicKey) -> u64 {
        self.balances.get(participant).copied().unwrap_or(0)
    }
}

#[cfg(any(test, feature = "mocks"))]
impl Treasury for Memory {
    fn reserve(&self) -> u64 {
        self.reserve
    }

    fn deposit(&mut self, from: &PublicKey, amount: u64) -> Result<(), TransferError> {
        let available = self.balance(from);
        if available < amount {
            return Err(TransferError::InsufficientFunds {
                needed: amount,
                available,
            });
        }
        self.balances.insert(from.clone(), available - amount);
        self.reserve = self.reserve.saturating_add(amount);
        Ok(())
    }

    fn fund(&mut self, amount: u64) {
        self.reserve = self.reserve.saturating_add(amount);
    }

    fn apply(&mut self, payouts: Vec<Payout>) -> Result<(), TransferError> {
        // Check the whole batch before moving anything.
        let needed = payouts
            .iter()
            .fold(0u64, |acc, p| acc.saturating_add(p.amount));
        if needed > self.reserve {
            return Err(TransferError::InsufficientReserve {
                needed,
                reserve: self.reserve,
            });
        }
        self.reserve -= needed;
        for payout in payouts {
            let balance = self.balances.entry(payout.to).or_default();
            *balance = balance.saturating_add(payout.amount);
        }
        Ok(())
    }
}
