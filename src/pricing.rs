/// Price of one whole token in base-asset base units (0.001 of a 9 decimal asset).
pub const UNIT_PRICE: u64 = 1_000_000;
pub const BASE_ASSET_DECIMALS: u32 = 9;
pub const TOKEN_DECIMALS: u32 = 9;
/// Supply cap in whole tokens. Enforced by the token contract.
pub const MAX_SUPPLY: u64 = 10_000;
pub const TOKENS_PER_COLLECTIBLE: u64 = 10;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Pricing {
    pub unit_price: u64,
    pub payment_decimals: u32,
    pub token_decimals: u32,
    pub max_supply: u64,
    pub tokens_per_collectible: u64,
}

impl Default for Pricing {
    fn default() -> Self {
        Pricing {
            unit_price: UNIT_PRICE,
            payment_decimals: BASE_ASSET_DECIMALS,
            token_decimals: TOKEN_DECIMALS,
            max_supply: MAX_SUPPLY,
            tokens_per_collectible: TOKENS_PER_COLLECTIBLE,
        }
    }
}

impl Pricing {
    /// Payment required to mint `amount` whole tokens, `None` on overflow.
    pub fn payment_for(&self, amount: u64) -> Option<u64> {
        amount.checked_mul(self.unit_price)
    }

    pub fn claimable_tokens(&self, claimable_count: u64) -> u64 {
        claimable_count.saturating_mul(self.tokens_per_collectible)
    }

    pub fn format_payment(&self, value: u64) -> String {
        format_units(value, self.payment_decimals)
    }

    pub fn format_tokens(&self, value: u64) -> String {
        format_units(value, self.token_decimals)
    }
}

pub fn format_units(value: u64, decimals: u32) -> String {
    let one_unit = 10u64.saturating_pow(decimals);
    let whole = value / one_unit;
    let fractional = value % one_unit;
    if fractional == 0 {
        format!("{}", whole)
    } else {
        format!(
            "{}.{}",
            whole,
            format!("{:0width$}", fractional, width = decimals as usize)
                .trim_end_matches('0')
        )
    }
}
