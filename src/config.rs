use serde::{Deserialize, Serialize};
use solana_program::pubkey::Pubkey;

use crate::{
    error::{EscrowError, Result},
    money::BPS_DENOMINATOR,
};

pub const DEFAULT_FEE_BPS: u16 = 100;
pub const DEFAULT_REWARD_BPS: u16 = 100;
/// 4.5 % a year.
pub const DEFAULT_ANNUAL_YIELD_BPS: u32 = 450;

/// How far past the payment day rent is still accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RentWindowPolicy {
    pub grace_days: u8,
    pub allow_late_payment: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Account that holds deposits and routes rent.
    #[serde(with = "pubkey_string")]
    pub escrow_account: Pubkey,
    #[serde(with = "pubkey_string")]
    pub fee_collector: Pubkey,
    #[serde(default = "default_fee_bps")]
    pub fee_bps: u16,
    #[serde(default = "default_reward_bps")]
    pub reward_bps: u16,
    #[serde(default = "default_annual_yield_bps")]
    pub annual_yield_bps: u32,
    #[serde(default)]
    pub rent_window: RentWindowPolicy,
}

fn default_fee_bps() -> u16 {
    DEFAULT_FEE_BPS
}

fn default_reward_bps() -> u16 {
    DEFAULT_REWARD_BPS
}

fn default_annual_yield_bps() -> u32 {
    DEFAULT_ANNUAL_YIELD_BPS
}

impl EngineConfig {
    pub fn new(escrow_account: Pubkey, fee_collector: Pubkey) -> Self {
        EngineConfig {
            escrow_account,
            fee_collector,
            fee_bps: DEFAULT_FEE_BPS,
            reward_bps: DEFAULT_REWARD_BPS,
            annual_yield_bps: DEFAULT_ANNUAL_YIELD_BPS,
            rent_window: RentWindowPolicy::default(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)
            .map_err(|e| EscrowError::Serialization(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if u64::from(self.fee_bps) + u64::from(self.reward_bps) > BPS_DENOMINATOR {
            return Err(EscrowError::InvalidConfig("fee and reward exceed the rent amount"));
        }
        if self.rent_window.grace_days > 27 {
            return Err(EscrowError::InvalidConfig("grace period longer than a month"));
        }
        if self.escrow_account == self.fee_collector {
            return Err(EscrowError::InvalidConfig("escrow and fee collector must differ"));
        }
        Ok(())
    }
}

mod pubkey_string {
    use std::str::FromStr;

    use serde::{de::Error, Deserialize, Deserializer, Serializer};
    use solana_program::pubkey::Pubkey;

    pub fn serialize<S: Serializer>(key: &Pubkey, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&key.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Pubkey, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        Pubkey::from_str(&encoded).map_err(D::Error::custom)
    }
}
