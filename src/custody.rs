use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use solana_program::{keccak, pubkey::Pubkey};

use crate::{error::TransferError, money::MonetaryAmount, state::TransferReceipt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferLeg {
    pub from: Pubkey,
    pub to: Pubkey,
    pub amount: MonetaryAmount,
}

impl TransferLeg {
    pub fn new(from: Pubkey, to: Pubkey, amount: MonetaryAmount) -> Self {
        TransferLeg { from, to, amount }
    }
}

/// Value movement capability. Each call either commits completely or moves
/// nothing.
pub trait Custody {
    fn transfer(
        &self,
        token: &Pubkey,
        from: &Pubkey,
        to: &Pubkey,
        amount: MonetaryAmount,
    ) -> Result<TransferReceipt, TransferError>;

    /// Executes every leg or none of them, in order.
    fn transfer_batch(
        &self,
        token: &Pubkey,
        legs: &[TransferLeg],
    ) -> Result<TransferReceipt, TransferError>;
}

impl<T: Custody + ?Sized> Custody for Arc<T> {
    fn transfer(
        &self,
        token: &Pubkey,
        from: &Pubkey,
        to: &Pubkey,
        amount: MonetaryAmount,
    ) -> Result<TransferReceipt, TransferError> {
        (**self).transfer(token, from, to, amount)
    }

    fn transfer_batch(
        &self,
        token: &Pubkey,
        legs: &[TransferLeg],
    ) -> Result<TransferReceipt, TransferError> {
        (**self).transfer_batch(token, legs)
    }
}

#[derive(Default)]
struct Ledger {
    balances: HashMap<(Pubkey, Pubkey), u64>,
    nonce: u64,
}

/// Balance ledger kept in memory, keyed by `(token, owner)`.
#[derive(Default)]
pub struct InMemoryCustody {
    ledger: Mutex<Ledger>,
}

impl InMemoryCustody {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Ledger> {
        // A panic while holding the lock cannot leave a half-applied batch.
        match self.ledger.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn mint(&self, token: &Pubkey, owner: &Pubkey, amount: MonetaryAmount) {
        let mut ledger = self.lock();
        let balance = ledger.balances.entry((*token, *owner)).or_insert(0);
        *balance = balance.saturating_add(amount.minor_units());
    }

    pub fn balance_of(&self, token: &Pubkey, owner: &Pubkey) -> MonetaryAmount {
        let ledger = self.lock();
        MonetaryAmount::from_minor(ledger.balances.get(&(*token, *owner)).copied().unwrap_or(0))
    }
}

impl Custody for InMemoryCustody {
    fn transfer(
        &self,
        token: &Pubkey,
        from: &Pubkey,
        to: &Pubkey,
        amount: MonetaryAmount,
    ) -> Result<TransferReceipt, TransferError> {
        self.transfer_batch(token, &[TransferLeg::new(*from, *to, amount)])
    }

    fn transfer_batch(
        &self,
        token: &Pubkey,
        legs: &[TransferLeg],
    ) -> Result<TransferReceipt, TransferError> {
        let mut ledger = self.lock();

        // Apply to a scratch copy of the touched balances, publish only if
        // every leg succeeds.
        let mut scratch: HashMap<(Pubkey, Pubkey), u64> = HashMap::new();
        for leg in legs {
            for owner in [leg.from, leg.to] {
                let key = (*token, owner);
                let current = ledger.balances.get(&key).copied().unwrap_or(0);
                scratch.entry(key).or_insert(current);
            }
        }
        for leg in legs {
            let amount = leg.amount.minor_units();
            let available = scratch[&(*token, leg.from)];
            if available < amount {
                return Err(TransferError::InsufficientFunds {
                    owner: leg.from,
                    available,
                    required: amount,
                });
            }
            scratch.insert((*token, leg.from), available - amount);
            let credited = scratch[&(*token, leg.to)]
                .checked_add(amount)
                .ok_or_else(|| TransferError::Declined("balance overflow".to_string()))?;
            scratch.insert((*token, leg.to), credited);
        }
        ledger.balances.extend(scratch);

        ledger.nonce += 1;
        let nonce = ledger.nonce.to_le_bytes();
        let reference = keccak::hashv(&[token.as_ref(), &nonce[..]]).to_bytes();
        Ok(TransferReceipt { reference })
    }
}
