use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{clock::UnixTimestamp, keccak, pubkey::Pubkey};

use crate::{
    error::{EscrowError, Result},
    money::MonetaryAmount,
};

pub type AgreementId = u64;

/// Calendar month index, `year * 12 + month0`.
pub type RentCycle = u32;

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgreementStatus {
    PendingTenantSignature,
    PendingLandlordSignature,
    Active,
    Completed,
    Cancelled,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Landlord,
    Tenant,
}

/// Signature bytes as produced by the wallet collaborator. Opaque to the engine.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct Signature(pub Vec<u8>);

pub type ContentHash = [u8; 32];

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct Attestation {
    pub content_hash: ContentHash,
    pub signature: Signature,
    pub signed_at: UnixTimestamp,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Signatures {
    pub landlord: Option<Attestation>,
    pub tenant: Option<Attestation>,
}

impl Signatures {
    pub fn slot_mut(&mut self, role: Role) -> &mut Option<Attestation> {
        match role {
            Role::Landlord => &mut self.landlord,
            Role::Tenant => &mut self.tenant,
        }
    }
}

/// Negotiable part of an agreement, supplied by the landlord.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct AgreementTerms {
    pub tenant: Pubkey,
    pub token: Pubkey,
    pub property: String,
    pub rent_amount: MonetaryAmount,
    pub security_deposit: MonetaryAmount,
    pub start_date: UnixTimestamp,
    pub end_date: UnixTimestamp,
    pub payment_day: u8,
}

pub const MAX_PROPERTY_LEN: usize = 256;

impl AgreementTerms {
    pub fn validate(&self, landlord: &Pubkey) -> Result<()> {
        if *landlord == self.tenant {
            return Err(EscrowError::ValidationError("landlord and tenant must differ"));
        }
        if self.end_date <= self.start_date {
            return Err(EscrowError::ValidationError("end date must follow start date"));
        }
        if !(1..=28).contains(&self.payment_day) {
            return Err(EscrowError::ValidationError("payment day must be within 1..=28"));
        }
        if self.property.len() > MAX_PROPERTY_LEN {
            return Err(EscrowError::ValidationError("property label too long"));
        }
        Ok(())
    }
}

#[derive(BorshSerialize)]
struct SignedContent<'a> {
    landlord: &'a Pubkey,
    tenant: &'a Pubkey,
    token: &'a Pubkey,
    property: &'a str,
    rent_amount: MonetaryAmount,
    security_deposit: MonetaryAmount,
    start_date: UnixTimestamp,
    end_date: UnixTimestamp,
    payment_day: u8,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub enum SettlementKind {
    RentPayment {
        cycle: RentCycle,
        landlord_share: MonetaryAmount,
        fee: MonetaryAmount,
        reward: MonetaryAmount,
    },
    YieldWithdrawal,
}

/// One settled fund movement. Appended to [`Agreement::transactions`] and
/// never modified afterwards.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct SettlementEvent {
    pub sequence: u32,
    pub kind: SettlementKind,
    pub amount: MonetaryAmount,
    pub from: Pubkey,
    pub to: Pubkey,
    pub timestamp: UnixTimestamp,
    pub receipt: TransferReceipt,
}

/// Reference handed back by custody for a committed transfer. All zeroes when
/// nothing had to move.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferReceipt {
    pub reference: [u8; 32],
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    SignAndDeposit,
    PayRent,
    WithdrawYield,
    Complete,
    Cancel,
}

/// Marker written when an operation claims the record ahead of a transfer.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingOperation {
    pub kind: OperationKind,
    pub caller: Pubkey,
    pub claimed_at: UnixTimestamp,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct Agreement {
    pub id: AgreementId,
    pub landlord: Pubkey,
    pub tenant: Pubkey,
    pub token: Pubkey,
    pub property: String,
    pub rent_amount: MonetaryAmount,
    pub security_deposit: MonetaryAmount,
    pub start_date: UnixTimestamp,
    pub end_date: UnixTimestamp,
    pub payment_day: u8,
    pub status: AgreementStatus,

    pub created_at: UnixTimestamp,
    pub tenant_signed_at: Option<UnixTimestamp>,
    pub activated_at: Option<UnixTimestamp>,
    pub closed_at: Option<UnixTimestamp>,

    pub last_rent_payment: Option<UnixTimestamp>,
    pub last_paid_cycle: Option<RentCycle>,
    pub deposit_held: MonetaryAmount,

    pub accrued_yield: MonetaryAmount,
    pub total_yield_paid: MonetaryAmount,
    pub yield_days_accrued: u64,
    pub last_accrual: Option<UnixTimestamp>,
    pub last_yield_withdrawal: Option<UnixTimestamp>,

    pub rewards_earned: MonetaryAmount,
    pub fees_paid: MonetaryAmount,

    pub signatures: Signatures,
    pub transactions: Vec<SettlementEvent>,
    pub pending: Option<PendingOperation>,
}

impl Agreement {
    pub fn new(
        id: AgreementId,
        landlord: Pubkey,
        terms: AgreementTerms,
        created_at: UnixTimestamp,
    ) -> Self {
        Agreement {
            id,
            landlord,
            tenant: terms.tenant,
            token: terms.token,
            property: terms.property,
            rent_amount: terms.rent_amount,
            security_deposit: terms.security_deposit,
            start_date: terms.start_date,
            end_date: terms.end_date,
            payment_day: terms.payment_day,
            status: AgreementStatus::PendingTenantSignature,
            created_at,
            tenant_signed_at: None,
            activated_at: None,
            closed_at: None,
            last_rent_payment: None,
            last_paid_cycle: None,
            deposit_held: MonetaryAmount::ZERO,
            accrued_yield: MonetaryAmount::ZERO,
            total_yield_paid: MonetaryAmount::ZERO,
            yield_days_accrued: 0,
            last_accrual: None,
            last_yield_withdrawal: None,
            rewards_earned: MonetaryAmount::ZERO,
            fees_paid: MonetaryAmount::ZERO,
            signatures: Signatures::default(),
            transactions: Vec::new(),
            pending: None,
        }
    }

    /// Replaces the negotiable terms. Tenant and token stay fixed.
    pub fn apply_terms(&mut self, terms: AgreementTerms) {
        self.property = terms.property;
        self.rent_amount = terms.rent_amount;
        self.security_deposit = terms.security_deposit;
        self.start_date = terms.start_date;
        self.end_date = terms.end_date;
        self.payment_day = terms.payment_day;
    }

    /// Keccak-256 over the Borsh encoding of the parties and terms.
    pub fn content_hash(&self) -> Result<ContentHash> {
        let content = SignedContent {
            landlord: &self.landlord,
            tenant: &self.tenant,
            token: &self.token,
            property: &self.property,
            rent_amount: self.rent_amount,
            security_deposit: self.security_deposit,
            start_date: self.start_date,
            end_date: self.end_date,
            payment_day: self.payment_day,
        };
        let bytes = borsh::to_vec(&content)?;
        Ok(keccak::hashv(&[bytes.as_slice()]).to_bytes())
    }

    pub fn role_of(&self, key: &Pubkey) -> Option<Role> {
        if *key == self.landlord {
            Some(Role::Landlord)
        } else if *key == self.tenant {
            Some(Role::Tenant)
        } else {
            None
        }
    }

    pub fn next_sequence(&self) -> u32 {
        self.transactions.len() as u32
    }
}
