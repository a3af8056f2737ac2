use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::decimal::Rate;

/// engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// flat monthly rate applied when deriving loan terms at approval
    pub monthly_interest_rate: Rate,
    /// days of lateness that accrue one full interest amount of penalty
    pub penalty_period_days: u32,
    /// fixed page size for the listing facade
    pub page_size: usize,
    /// digits in a generated transaction id
    pub transaction_id_len: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            monthly_interest_rate: Rate::from_decimal(dec!(0.03)),
            penalty_period_days: 30,
            page_size: 10,
            transaction_id_len: 6,
        }
    }
}
