use crate::{money::MonetaryAmount, state::Agreement};

/// Decides how the escrowed deposit is split when an agreement completes.
///
/// Dispute handling lives outside the engine. An implementation reports an
/// open claim to hold completion back, and the agreed deduction once the claim
/// is resolved. The deduction goes to the landlord and the rest to the tenant.
pub trait DepositSettlement {
    fn has_open_claim(&self, agreement: &Agreement) -> bool;

    fn deduction(&self, agreement: &Agreement) -> MonetaryAmount;
}

/// Returns the whole deposit to the tenant.
#[derive(Debug, Default, Clone, Copy)]
pub struct FullRelease;

impl DepositSettlement for FullRelease {
    fn has_open_claim(&self, _agreement: &Agreement) -> bool {
        false
    }

    fn deduction(&self, _agreement: &Agreement) -> MonetaryAmount {
        MonetaryAmount::ZERO
    }
}
