// This file is part of Barge.
//
// Barge is free software: you can redistribute it and/or modify it under the
// terms of the GNU Lesser General Public License as published by the Free Software
// Foundation, either version 3 of the License, or (at your option) any later version.
//
// Barge is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with Barge.
// If not, see https://www.gnu.org/licenses/.

use std::cmp;

use async_trait::async_trait;
use barge_utils::math;
#[cfg(feature = "test-utils")]
use mockall::automock;
use serde::{Deserialize, Serialize};

/// Gas fees for a transaction or user operation
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub struct GasFees {
    /// EIP-1559 max fee per gas
    pub max_fee_per_gas: u128,
    /// EIP-1559 max priority fee per gas
    pub max_priority_fee_per_gas: u128,
}

impl GasFees {
    /// Increase the gas fees by a percentage
    pub fn increase_by_percent(self, percent: u32) -> Self {
        Self {
            max_fee_per_gas: math::increase_by_percent_ceil(self.max_fee_per_gas, percent),
            max_priority_fee_per_gas: math::increase_by_percent_ceil(
                self.max_priority_fee_per_gas,
                percent,
            ),
        }
    }

    /// Get the gas price from these fees given a base fee
    pub fn gas_price(self, base_fee: u128) -> u128 {
        cmp::min(
            self.max_fee_per_gas,
            base_fee.saturating_add(self.max_priority_fee_per_gas),
        )
    }
}

/// Oracle for the network gas price, as required for timely inclusion
#[cfg_attr(feature = "test-utils", automock)]
#[async_trait]
pub trait GasOracle: Send + Sync + 'static {
    /// Get the current network gas fees
    async fn get_gas_price(&self) -> anyhow::Result<GasFees>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_increase_by_percent() {
        let fees = GasFees {
            max_fee_per_gas: 100,
            max_priority_fee_per_gas: 10,
        };
        assert_eq!(
            fees.increase_by_percent(10),
            GasFees {
                max_fee_per_gas: 110,
                max_priority_fee_per_gas: 11,
            }
        );
    }

    #[test]
    fn test_gas_price_capped_by_max_fee() {
        let fees = GasFees {
            max_fee_per_gas: 100,
            max_priority_fee_per_gas: 10,
        };
        assert_eq!(fees.gas_price(95), 100);
        assert_eq!(fees.gas_price(50), 60);
    }
}
