use anyhow::{bail, Context, Result};
use rust_decimal::Decimal;
use tracing::warn;

use std::{collections::BTreeSet, fmt::Display, path::Path};

use crate::{
    catalog::CatalogEntry,
    dedup::PriceList,
    error::RowError,
    money::Money,
    order::OrderLine,
    summary::{percent, Summary},
};

/// An order line priced against its catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputedLine {
    pub order: OrderLine,
    pub purchase_price: Money,
    pub sale_price: Money,
    /// Sale price after the line's discount.
    pub effective_unit_price: Money,
    pub revenue: Money,
    pub cost: Money,
    pub profit: Money,
    /// `profit / revenue`, absent when the line brings no revenue.
    pub margin: Option<Decimal>,
}

impl ComputedLine {
    /// Prices `order` with the prices of `entry`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use std::str::FromStr;
    /// # use pedido::{catalog::CatalogEntry, money::*, order::OrderLine, report::ComputedLine};
    /// let entry = CatalogEntry::new(
    ///     "Perfume A",
    ///     Money::from_str("10").unwrap(),
    ///     Money::from_str("20").unwrap(),
    /// )
    /// .unwrap();
    /// let order = OrderLine::new(
    ///     "Perfume A",
    ///     Quantity::new(3).unwrap(),
    ///     Discount::from_str("0.10").unwrap(),
    /// )
    /// .unwrap();
    /// let line = ComputedLine::new(order, &entry).unwrap();
    /// assert_eq!(line.revenue, Money::from_str("54").unwrap());
    /// assert_eq!(line.profit, Money::from_str("24").unwrap());
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error if an amount is too large to represent.
    pub fn new(order: OrderLine, entry: &CatalogEntry) -> Result<Self> {
        let effective_unit_price = entry.sale_price.discounted(order.discount);
        let (Some(revenue), Some(cost)) = (
            effective_unit_price.checked_mul(order.quantity),
            entry.purchase_price.checked_mul(order.quantity),
        ) else {
            bail!("amount overflow pricing {} units", order.quantity);
        };
        let profit = revenue
            .checked_sub(cost)
            .context("profit overflow")?;
        Ok(Self {
            purchase_price: entry.purchase_price,
            sale_price: entry.sale_price,
            effective_unit_price,
            revenue,
            cost,
            profit,
            margin: profit.ratio_of(revenue),
            order,
        })
    }
}

/// Holds the priced order.
///
/// To build a `Report`, use [`Report::compute`], or [`crate::calculate`] to
/// go straight from input files.
///
/// To get a printable version of the report, use its [`Display`]
/// implementation.
#[derive(Debug, Default)]
pub struct Report {
    pub lines: Vec<ComputedLine>,
    /// Order lines with no catalog entry, in file order. They count towards
    /// no total.
    pub unmatched: Vec<OrderLine>,
    /// Input rows skipped as malformed.
    pub rejected: Vec<RowError>,
    pub summary: Summary,
}

impl Report {
    /// Joins `orders`, read from `source`, against `prices` and totals the
    /// matched lines.
    ///
    /// A line whose amounts overflow is left out of the totals and recorded
    /// in [`Report::rejected`].
    #[must_use]
    pub fn compute(orders: Vec<OrderLine>, prices: &PriceList, source: &Path) -> Self {
        let mut report = Self::default();
        for order in orders {
            let Some(entry) = prices.get(&order.key) else {
                report.unmatched.push(order);
                continue;
            };
            let line = order.line;
            let priced = ComputedLine::new(order, entry).and_then(|computed| {
                report.summary.add(&computed)?;
                Ok(computed)
            });
            match priced {
                Ok(computed) => report.lines.push(computed),
                Err(err) => {
                    let err = RowError::new(source, line, err);
                    warn!("skipping order row: {err}");
                    report.rejected.push(err);
                }
            }
        }
        for name in report.unmatched_products() {
            warn!(product = name, "not found in catalog");
        }
        report
    }

    /// Returns the names of unmatched products, each once, in order of first
    /// appearance.
    #[must_use]
    pub fn unmatched_products(&self) -> Vec<&str> {
        let mut seen = BTreeSet::new();
        self.unmatched
            .iter()
            .filter(|line| seen.insert(line.key.as_str()))
            .map(|line| line.name.as_str())
            .collect()
    }
}

impl Display for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== ORDER SUMMARY ===")?;
        write!(f, "{}", self.summary)?;

        writeln!(f)?;
        writeln!(f, "=== DETAIL ===")?;
        let width = self
            .lines
            .iter()
            .map(|line| line.order.name.chars().count())
            .max()
            .unwrap_or_default()
            .max("Product".len());
        writeln!(
            f,
            "{:width$} {:>5} {:>5} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10} {:>7}",
            "Product",
            "Qty",
            "Disc",
            "Price",
            "Net price",
            "Unit cost",
            "Revenue",
            "Cost",
            "Profit",
            "Margin",
        )?;
        let length = width + 2 * 6 + 6 * 11 + 8;
        writeln!(f, "{:-<length$}", "")?;
        for line in &self.lines {
            writeln!(
                f,
                "{:width$} {:>5} {:>5} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10} {:>7}",
                line.order.name,
                line.order.quantity,
                line.order.discount.to_string(),
                line.sale_price,
                line.effective_unit_price,
                line.purchase_price,
                line.revenue,
                line.cost,
                line.profit,
                line.margin.map(percent).unwrap_or_default(),
            )?;
        }
        writeln!(f, "{:-<length$}", "")?;

        let unmatched = self.unmatched_products();
        if !unmatched.is_empty() {
            writeln!(f)?;
            writeln!(f, "Not found in catalog (check the names):")?;
            for name in unmatched {
                writeln!(f, " - {name}")?;
            }
        }
        if !self.rejected.is_empty() {
            writeln!(f)?;
            writeln!(f, "Skipped rows:")?;
            for err in &self.rejected {
                writeln!(f, " - {err}")?;
            }
        }
        Ok(())
    }
}
