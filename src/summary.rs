use anyhow::{bail, Result};
use rust_decimal::{Decimal, RoundingStrategy};

use std::fmt::Display;

use crate::{money::Money, report::ComputedLine};

/// Order-wide totals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub total_revenue: Money,
    pub total_cost: Money,
    pub total_profit: Money,
    /// `total_profit / total_revenue`, or zero when there is no revenue.
    pub weighted_margin: Decimal,
}

impl Summary {
    /// Adds `line` to the totals.
    ///
    /// Because the margin is taken from the totals rather than averaged per
    /// line, each line weighs in proportion to its revenue.
    ///
    /// # Errors
    ///
    /// Returns an error, leaving the totals unchanged, if any total would
    /// overflow.
    pub fn add(&mut self, line: &ComputedLine) -> Result<()> {
        let (Some(total_revenue), Some(total_cost), Some(total_profit)) = (
            self.total_revenue.checked_add(line.revenue),
            self.total_cost.checked_add(line.cost),
            self.total_profit.checked_add(line.profit),
        ) else {
            bail!("order totals overflow");
        };
        self.total_revenue = total_revenue;
        self.total_cost = total_cost;
        self.total_profit = total_profit;
        self.weighted_margin = total_profit
            .ratio_of(total_revenue)
            .unwrap_or(Decimal::ZERO);
        Ok(())
    }
}

impl Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Total revenue  {:>12}", self.total_revenue)?;
        writeln!(f, "Total cost     {:>12}", self.total_cost)?;
        writeln!(f, "Total profit   {:>12}", self.total_profit)?;
        writeln!(f, "Weighted margin {:>11}", percent(self.weighted_margin))
    }
}

/// Formats a ratio as a percentage with one decimal place.
#[must_use]
pub fn percent(ratio: Decimal) -> String {
    let pct = (ratio * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero);
    format!("{pct:.1}%")
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::{
        catalog::CatalogEntry,
        money::{Discount, Quantity},
        order::OrderLine,
    };

    fn line(purchase: Decimal, sale: Decimal, qty: u32) -> ComputedLine {
        let entry = CatalogEntry::new("Perfume", Money::new(purchase), Money::new(sale)).unwrap();
        let order = OrderLine::new("Perfume", Quantity::new(qty).unwrap(), Discount::default());
        ComputedLine::new(order.unwrap(), &entry).unwrap()
    }

    #[test]
    fn add_fn_guards_zero_revenue() {
        let mut summary = Summary::default();
        summary.add(&line(dec!(1), dec!(0), 4)).unwrap();
        assert_eq!(summary.total_revenue, Money::ZERO);
        assert_eq!(summary.total_profit, Money::new(dec!(-4)));
        assert_eq!(summary.weighted_margin, Decimal::ZERO);
    }

    #[test]
    fn add_fn_weights_margin_by_revenue() {
        let mut summary = Summary::default();
        summary.add(&line(dec!(10), dec!(20), 1)).unwrap();
        summary.add(&line(dec!(30), dec!(40), 2)).unwrap();
        assert_eq!(summary.total_revenue, Money::new(dec!(100)));
        assert_eq!(summary.weighted_margin, dec!(0.3));
    }

    #[test]
    fn add_fn_leaves_totals_unchanged_on_overflow() {
        let big = line(dec!(0), dec!(10000000000000000000), 4_000_000_000);
        let mut summary = Summary::default();
        summary.add(&big).unwrap();
        let before = summary;
        assert!(summary.add(&big).is_err());
        assert_eq!(summary, before);
    }

    #[test]
    fn percent_fn_formats_one_decimal() {
        assert_eq!(percent(dec!(0.4444)), "44.4%");
        assert_eq!(percent(dec!(0.0005)), "0.1%");
        assert_eq!(percent(Decimal::ZERO), "0.0%");
        assert_eq!(percent(dec!(-0.25)), "-25.0%");
    }
}
