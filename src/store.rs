use std::{
    collections::{BTreeSet, HashMap},
    sync::{Arc, Mutex, MutexGuard},
};

use borsh::BorshDeserialize;
use solana_program::{msg, pubkey::Pubkey};

use crate::{
    error::{EscrowError, Result},
    state::{Agreement, AgreementId},
    LOG_TAG_NAME,
};

/// Version of a record that does not exist yet.
pub const ABSENT: u64 = 0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAgreement {
    pub version: u64,
    pub agreement: Agreement,
}

/// Keyed persistence of agreements with an optimistic-concurrency contract.
///
/// Implementations keep one authoritative record per id. The per-participant
/// view returned by [`AgreementStore::list_by_participant`] is derived from
/// those records and must reflect every committed write.
pub trait AgreementStore {
    fn allocate_id(&self) -> Result<AgreementId>;

    fn get(&self, id: AgreementId) -> Result<Option<StoredAgreement>>;

    /// Unconditional full replace. Returns the new version.
    fn put(&self, agreement: &Agreement) -> Result<u64>;

    /// Writes only if the stored version equals `expected` ([`ABSENT`] when
    /// the record must not exist yet). Returns the new version.
    fn put_if_matches_version(&self, agreement: &Agreement, expected: u64) -> Result<u64>;

    fn list_by_participant(&self, participant: &Pubkey) -> Result<Vec<StoredAgreement>>;
}

impl<T: AgreementStore + ?Sized> AgreementStore for Arc<T> {
    fn allocate_id(&self) -> Result<AgreementId> {
        (**self).allocate_id()
    }

    fn get(&self, id: AgreementId) -> Result<Option<StoredAgreement>> {
        (**self).get(id)
    }

    fn put(&self, agreement: &Agreement) -> Result<u64> {
        (**self).put(agreement)
    }

    fn put_if_matches_version(&self, agreement: &Agreement, expected: u64) -> Result<u64> {
        (**self).put_if_matches_version(agreement, expected)
    }

    fn list_by_participant(&self, participant: &Pubkey) -> Result<Vec<StoredAgreement>> {
        (**self).list_by_participant(participant)
    }
}

struct Slot {
    version: u64,
    data: Vec<u8>,
}

#[derive(Default)]
struct Tables {
    records: HashMap<AgreementId, Slot>,
    by_participant: HashMap<Pubkey, BTreeSet<AgreementId>>,
    last_id: AgreementId,
}

impl Tables {
    fn decode(&self, id: AgreementId) -> Result<Option<StoredAgreement>> {
        match self.records.get(&id) {
            None => Ok(None),
            Some(slot) => {
                let agreement = Agreement::try_from_slice(&slot.data).map_err(|e| {
                    msg!("{} Agreement {} data unreadable: {}", LOG_TAG_NAME, id, e);
                    EscrowError::Serialization(e.to_string())
                })?;
                Ok(Some(StoredAgreement {
                    version: slot.version,
                    agreement,
                }))
            }
        }
    }

    fn version_of(&self, id: AgreementId) -> u64 {
        self.records.get(&id).map(|slot| slot.version).unwrap_or(ABSENT)
    }

    /// Record and participant index change together under the caller's lock.
    fn write(&mut self, agreement: &Agreement) -> Result<u64> {
        let data = borsh::to_vec(agreement)?;
        let version = self.version_of(agreement.id) + 1;
        self.records.insert(agreement.id, Slot { version, data });
        for participant in [agreement.landlord, agreement.tenant] {
            self.by_participant
                .entry(participant)
                .or_default()
                .insert(agreement.id);
        }
        if agreement.id > self.last_id {
            self.last_id = agreement.id;
        }
        Ok(version)
    }
}

/// Borsh-encoded records held in memory behind a single lock.
#[derive(Default)]
pub struct InMemoryAgreementStore {
    tables: Mutex<Tables>,
}

impl InMemoryAgreementStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        match self.tables.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl AgreementStore for InMemoryAgreementStore {
    fn allocate_id(&self) -> Result<AgreementId> {
        let mut tables = self.lock();
        tables.last_id = tables
            .last_id
            .checked_add(1)
            .ok_or(EscrowError::ArithmeticOverflow)?;
        Ok(tables.last_id)
    }

    fn get(&self, id: AgreementId) -> Result<Option<StoredAgreement>> {
        self.lock().decode(id)
    }

    fn put(&self, agreement: &Agreement) -> Result<u64> {
        self.lock().write(agreement)
    }

    fn put_if_matches_version(&self, agreement: &Agreement, expected: u64) -> Result<u64> {
        let mut tables = self.lock();
        let found = tables.version_of(agreement.id);
        if found != expected {
            msg!(
                "{} Stale write on agreement {}: expected version {}, found {}",
                LOG_TAG_NAME,
                agreement.id,
                expected,
                found
            );
            return Err(EscrowError::StaleWrite {
                id: agreement.id,
                expected,
                found,
            });
        }
        tables.write(agreement)
    }

    fn list_by_participant(&self, participant: &Pubkey) -> Result<Vec<StoredAgreement>> {
        let tables = self.lock();
        let ids = match tables.by_participant.get(participant) {
            Some(ids) => ids,
            None => return Ok(Vec::new()),
        };
        let mut listed = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(stored) = tables.decode(*id)? {
                listed.push(stored);
            }
        }
        Ok(listed)
    }
}
