//! Rental escrow between a landlord and a tenant: two-phase signing with a
//! security deposit held in escrow, monthly rent with a protocol fee and a
//! tenant reward, yield accrued on the deposit, and settlement at the end of
//! the term.

pub mod clock;
pub mod config;
pub mod custody;
pub mod engine;
pub mod error;
pub mod fees;
pub mod instruction;
pub mod money;
pub mod processor;
pub mod schedule;
pub mod settlement;
pub mod signature;
pub mod state;
pub mod store;
pub mod yield_model;


pub use config::{EngineConfig, RentWindowPolicy};
pub use engine::EscrowEngine;
pub use error::{EscrowError, Result, TransferError};
pub use money::MonetaryAmount;
pub use state::{Agreement, AgreementId, AgreementStatus, AgreementTerms, Role, Signature};

pub(crate) static LOG_TAG_NAME: &str = "[rental_escrow]";
