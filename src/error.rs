use thiserror::Error;

use solana_program::{program_error::ProgramError, pubkey::Pubkey};

use crate::state::{AgreementId, AgreementStatus, TransferReceipt};

pub type Result<T> = std::result::Result<T, EscrowError>;

/// Failure reported by the custody capability. The transfer is assumed not to
/// have moved any value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("Insufficient funds: {owner} holds {available}, needs {required}")]
    InsufficientFunds {
        owner: Pubkey,
        available: u64,
        required: u64,
    },

    #[error("Transfer declined: {0}")]
    Declined(String),

    #[error("Transfer timed out")]
    Timeout,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EscrowError {
    #[error("Caller {caller} may not {operation} agreement {id}")]
    RoleMismatch {
        id: AgreementId,
        caller: Pubkey,
        operation: &'static str,
    },

    #[error("Cannot {operation} agreement {id} while {status:?}: {reason}")]
    InvalidTransition {
        id: AgreementId,
        status: AgreementStatus,
        operation: &'static str,
        reason: &'static str,
    },

    #[error("Transfer for agreement {id} failed: {source}")]
    TransferFailed {
        id: AgreementId,
        #[source]
        source: TransferError,
    },

    /// Custody declined and the claim on the record could not be released.
    /// No funds moved. The record stays claimed at `version` until
    /// `EscrowEngine::recover_claim` runs.
    #[error("Claim on agreement {id} kept at version {version} after {transfer}: {store}")]
    RestoreFailed {
        id: AgreementId,
        version: u64,
        transfer: TransferError,
        #[source]
        store: Box<EscrowError>,
    },

    /// Custody moved the funds but the settled record was not stored. The
    /// record stays claimed at `version` until `EscrowEngine::recover_claim`
    /// writes the settled state.
    #[error("Agreement {id} settled but version {version} was not stored: {store}")]
    CommitFailed {
        id: AgreementId,
        version: u64,
        receipt: TransferReceipt,
        #[source]
        store: Box<EscrowError>,
    },

    #[error("Signature does not verify for {signer}")]
    SignatureMismatch { signer: Pubkey },

    #[error("{signer} already attested different content")]
    DuplicateSignature { signer: Pubkey },

    #[error("Stale write on agreement {id}: expected version {expected}, found {found}")]
    StaleWrite {
        id: AgreementId,
        expected: u64,
        found: u64,
    },

    #[error("Rent for agreement {id} is outside the payment window: {reason}")]
    OutOfWindow { id: AgreementId, reason: &'static str },

    #[error("Invalid agreement terms: {0}")]
    ValidationError(&'static str),

    #[error("Agreement {0} not found")]
    AgreementNotFound(AgreementId),

    #[error("Clock moved backwards: last accrual at {last}, now {now}")]
    ClockRollback { last: i64, now: i64 },

    #[error("Arithmetic overflow")]
    ArithmeticOverflow,

    #[error("Invalid engine configuration: {0}")]
    InvalidConfig(&'static str),

    #[error("Record encoding failed: {0}")]
    Serialization(String),

    #[error("Invalid instruction data")]
    InvalidInstruction,
}

impl EscrowError {
    /// Stable numeric code for callers that should not parse messages.
    pub fn code(&self) -> u32 {
        match self {
            EscrowError::RoleMismatch { .. } => 100,
            EscrowError::InvalidTransition { .. } => 101,
            EscrowError::TransferFailed { .. } => 102,
            EscrowError::SignatureMismatch { .. } => 103,
            EscrowError::DuplicateSignature { .. } => 104,
            EscrowError::StaleWrite { .. } => 105,
            EscrowError::OutOfWindow { .. } => 106,
            EscrowError::ValidationError(_) => 107,
            EscrowError::AgreementNotFound(_) => 108,
            EscrowError::ClockRollback { .. } => 109,
            EscrowError::ArithmeticOverflow => 110,
            EscrowError::InvalidConfig(_) => 111,
            EscrowError::Serialization(_) => 112,
            EscrowError::InvalidInstruction => 113,
            EscrowError::RestoreFailed { .. } => 114,
            EscrowError::CommitFailed { .. } => 115,
        }
    }
}

impl From<EscrowError> for ProgramError {
    fn from(e: EscrowError) -> Self {
        ProgramError::Custom(e.code())
    }
}

impl From<std::io::Error> for EscrowError {
    fn from(e: std::io::Error) -> Self {
        EscrowError::Serialization(e.to_string())
    }
}
