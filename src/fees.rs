use solana_program::pubkey::Pubkey;

use crate::{
    custody::TransferLeg,
    error::{EscrowError, Result},
    money::{MonetaryAmount, BPS_DENOMINATOR},
};

/// Three-way split of one rent payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RentSplit {
    pub rent: MonetaryAmount,
    pub fee: MonetaryAmount,
    pub reward: MonetaryAmount,
    pub landlord_share: MonetaryAmount,
}

#[derive(Debug, Clone, Copy)]
pub struct FeeCollector {
    collector: Pubkey,
    fee_bps: u16,
    reward_bps: u16,
}

impl FeeCollector {
    pub fn new(collector: Pubkey, fee_bps: u16, reward_bps: u16) -> Result<Self> {
        if u64::from(fee_bps) + u64::from(reward_bps) > BPS_DENOMINATOR {
            return Err(EscrowError::InvalidConfig("fee and reward exceed the rent amount"));
        }
        Ok(FeeCollector {
            collector,
            fee_bps,
            reward_bps,
        })
    }

    pub fn split(&self, rent: MonetaryAmount) -> Result<RentSplit> {
        let fee = rent.bps(self.fee_bps)?;
        let reward = rent.bps(self.reward_bps)?;
        let landlord_share = rent.checked_sub(fee)?.checked_sub(reward)?;
        Ok(RentSplit {
            rent,
            fee,
            reward,
            landlord_share,
        })
    }

    /// Custody legs for a rent payment routed through the escrow account.
    /// Zero-amount legs are left out.
    pub fn legs(
        &self,
        split: &RentSplit,
        tenant: &Pubkey,
        landlord: &Pubkey,
        escrow: &Pubkey,
    ) -> Vec<TransferLeg> {
        [
            TransferLeg::new(*tenant, *escrow, split.rent),
            TransferLeg::new(*escrow, *landlord, split.landlord_share),
            TransferLeg::new(*escrow, self.collector, split.fee),
            TransferLeg::new(*escrow, *tenant, split.reward),
        ]
        .into_iter()
        .filter(|leg| !leg.amount.is_zero())
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_percent_fee_and_reward() {
        let collector = FeeCollector::new(Pubkey::new_unique(), 100, 100).unwrap();
        let rent: MonetaryAmount = "1500.00".parse().unwrap();
        let split = collector.split(rent).unwrap();

        assert_eq!(split.fee, "15.00".parse().unwrap());
        assert_eq!(split.reward, "15.00".parse().unwrap());
        assert_eq!(split.landlord_share, "1470.00".parse().unwrap());
        let sum = split
            .fee
            .checked_add(split.reward)
            .unwrap()
            .checked_add(split.landlord_share)
            .unwrap();
        assert_eq!(sum, rent);
    }

    #[test]
    fn remainder_from_rounding_goes_to_landlord() {
        let collector = FeeCollector::new(Pubkey::new_unique(), 333, 17).unwrap();
        let rent = MonetaryAmount::from_minor(1_000_001);
        let split = collector.split(rent).unwrap();
        assert_eq!(split.fee.minor_units(), 33_300);
        assert_eq!(split.reward.minor_units(), 1_700);
        assert_eq!(split.landlord_share.minor_units(), 1_000_001 - 33_300 - 1_700);
    }

    #[test]
    fn rejects_cuts_above_rent() {
        assert!(FeeCollector::new(Pubkey::new_unique(), 9_000, 1_001).is_err());
        assert!(FeeCollector::new(Pubkey::new_unique(), 9_000, 1_000).is_ok());
    }

    #[test]
    fn legs_route_through_escrow() {
        let collector_key = Pubkey::new_unique();
        let collector = FeeCollector::new(collector_key, 100, 0).unwrap();
        let tenant = Pubkey::new_unique();
        let landlord = Pubkey::new_unique();
        let escrow = Pubkey::new_unique();
        let split = collector.split(MonetaryAmount::from_major(100).unwrap()).unwrap();
        let legs = collector.legs(&split, &tenant, &landlord, &escrow);

        assert_eq!(legs.len(), 3);
        let units = |n| MonetaryAmount::from_major(n).unwrap();
        assert_eq!(legs[0], TransferLeg::new(tenant, escrow, units(100)));
        assert_eq!(legs[1], TransferLeg::new(escrow, landlord, units(99)));
        assert_eq!(legs[2], TransferLeg::new(escrow, collector_key, units(1)));
    }
}
