//! Profitability calculation.
//!
//! Pure money math: sell price, acquisition cost and a category-keyed fee
//! schedule in, itemized fees, net profit, ROI and a sourcing tier out.
//! Deterministic and I/O-free so the API layer can expose it standalone.

use std::collections::HashMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::{Profitability, ProfitTier};

/// Fees for one marketplace category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryFees {
    /// Referral fee as a fraction of the sell price.
    #[serde(default = "default_referral_pct")]
    pub referral_pct: Decimal,
    /// Fixed per-item closing fee.
    #[serde(default = "default_closing_fee")]
    pub closing_fee: Decimal,
    /// Fulfillment estimate per kilogram of package weight.
    #[serde(default = "default_per_kg_fee")]
    pub per_kg_fee: Decimal,
}

fn default_referral_pct() -> Decimal {
    dec!(0.15)
}
fn default_closing_fee() -> Decimal {
    dec!(1.80)
}
fn default_per_kg_fee() -> Decimal {
    dec!(0.40)
}

impl Default for CategoryFees {
    fn default() -> Self {
        Self {
            referral_pct: default_referral_pct(),
            closing_fee: default_closing_fee(),
            per_kg_fee: default_per_kg_fee(),
        }
    }
}

/// Category → fees mapping with a fallback entry. Owned by configuration
/// and passed in explicitly; the calculator holds no global state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeeSchedule {
    #[serde(default)]
    pub default: CategoryFees,
    #[serde(default)]
    pub categories: HashMap<String, CategoryFees>,
}

impl FeeSchedule {
    pub fn for_category(&self, category: Option<&str>) -> &CategoryFees {
        category
            .and_then(|c| self.categories.get(&c.to_ascii_lowercase()))
            .unwrap_or(&self.default)
    }
}

fn tier_for(net_profit: Decimal, roi_percent: Option<Decimal>) -> ProfitTier {
    if net_profit <= Decimal::ZERO {
        return ProfitTier::Pass;
    }
    match roi_percent {
        Some(roi) if roi >= dec!(50) => ProfitTier::Excellent,
        Some(roi) if roi >= dec!(25) => ProfitTier::Good,
        Some(roi) if roi >= dec!(10) => ProfitTier::Fair,
        Some(_) => ProfitTier::Pass,
        // Zero acquisition cost with positive net: as good as it gets.
        None => ProfitTier::Excellent,
    }
}

/// Compute fees and profit for one sourcing decision.
///
/// `acquisition_cost == 0` leaves ROI undefined (`None`): the tier is then
/// decided by net profit alone. Never divides by a caller-supplied zero.
pub fn profitability(
    sell_price: Decimal,
    acquisition_cost: Decimal,
    weight_kg: Option<Decimal>,
    fees: &CategoryFees,
) -> Profitability {
    let referral_fee = (sell_price * fees.referral_pct).round_dp(2);
    let fulfillment_fee = weight_kg
        .map(|kg| (kg * fees.per_kg_fee).round_dp(2))
        .unwrap_or(Decimal::ZERO);
    let total_fees = referral_fee + fees.closing_fee + fulfillment_fee;
    let net_profit = sell_price - acquisition_cost - total_fees;

    let roi_percent = if acquisition_cost > Decimal::ZERO {
        Some((net_profit / acquisition_cost * dec!(100)).round_dp(2))
    } else {
        None
    };
    let margin_percent = if sell_price > Decimal::ZERO {
        Some((net_profit / sell_price * dec!(100)).round_dp(2))
    } else {
        None
    };

    Profitability {
        sell_price,
        acquisition_cost,
        referral_fee,
        closing_fee: fees.closing_fee,
        fulfillment_fee,
        total_fees,
        net_profit,
        roi_percent,
        margin_percent,
        tier: tier_for(net_profit, roi_percent),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_profit() {
        // $29.99 sale, $8 cost: referral 4.50, closing 1.80, no weight.
        let result = profitability(dec!(29.99), dec!(8.00), None, &CategoryFees::default());
        assert_eq!(result.referral_fee, dec!(4.50));
        assert_eq!(result.total_fees, dec!(6.30));
        assert_eq!(result.net_profit, dec!(15.69));
        // 15.69 / 8 * 100 = 196.125, banker's rounding lands on .12
        assert_eq!(result.roi_percent, Some(dec!(196.12)));
        assert_eq!(result.tier, ProfitTier::Excellent);
    }

    #[test]
    fn test_weight_fee_applied() {
        let with = profitability(
            dec!(20.00),
            dec!(5.00),
            Some(dec!(1.5)),
            &CategoryFees::default(),
        );
        let without = profitability(dec!(20.00), dec!(5.00), None, &CategoryFees::default());
        assert_eq!(with.fulfillment_fee, dec!(0.60));
        assert_eq!(without.fulfillment_fee, Decimal::ZERO);
        assert_eq!(without.net_profit - with.net_profit, dec!(0.60));
    }

    #[test]
    fn test_zero_cost_roi_undefined() {
        let result = profitability(dec!(15.00), Decimal::ZERO, None, &CategoryFees::default());
        assert_eq!(result.roi_percent, None);
        assert!(result.net_profit > Decimal::ZERO);
        assert_eq!(result.tier, ProfitTier::Excellent);
    }

    #[test]
    fn test_loss_is_pass_tier() {
        let result = profitability(dec!(5.00), dec!(10.00), None, &CategoryFees::default());
        assert!(result.net_profit < Decimal::ZERO);
        assert_eq!(result.tier, ProfitTier::Pass);
    }

    #[test]
    fn test_tier_thresholds() {
        let fees = CategoryFees {
            referral_pct: Decimal::ZERO,
            closing_fee: Decimal::ZERO,
            per_kg_fee: Decimal::ZERO,
        };
        // net = price - cost, roi = net / cost * 100
        let excellent = profitability(dec!(15.00), dec!(10.00), None, &fees); // 50%
        let good = profitability(dec!(12.50), dec!(10.00), None, &fees); // 25%
        let fair = profitability(dec!(11.00), dec!(10.00), None, &fees); // 10%
        let pass = profitability(dec!(10.50), dec!(10.00), None, &fees); // 5%
        assert_eq!(excellent.tier, ProfitTier::Excellent);
        assert_eq!(good.tier, ProfitTier::Good);
        assert_eq!(fair.tier, ProfitTier::Fair);
        assert_eq!(pass.tier, ProfitTier::Pass);
    }

    #[test]
    fn test_deterministic_and_idempotent() {
        let fees = CategoryFees::default();
        let a = profitability(dec!(24.99), dec!(6.50), Some(dec!(0.45)), &fees);
        let b = profitability(dec!(24.99), dec!(6.50), Some(dec!(0.45)), &fees);
        assert_eq!(a, b);
    }

    #[test]
    fn test_category_lookup_falls_back() {
        let mut schedule = FeeSchedule::default();
        schedule.categories.insert(
            "textbooks".to_string(),
            CategoryFees {
                closing_fee: dec!(2.50),
                ..Default::default()
            },
        );

        assert_eq!(
            schedule.for_category(Some("Textbooks")).closing_fee,
            dec!(2.50)
        );
        assert_eq!(
            schedule.for_category(Some("vinyl")).closing_fee,
            dec!(1.80)
        );
        assert_eq!(schedule.for_category(None).closing_fee, dec!(1.80));
    }
}
