use clap::ValueEnum;
use rust_decimal::Decimal;
use tracing::debug;

use std::{collections::BTreeMap, fmt::Display, str::FromStr};

use crate::{catalog::CatalogEntry, error::Error, money::Money};

/// How to resolve catalog entries that share a normalized product name but
/// disagree on price.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum DedupPolicy {
    /// Keep the first occurrence in file order.
    #[default]
    First,
    /// Keep the entry with the highest sale price.
    #[value(name = "max_venta")]
    MaxSale,
    /// Keep the entry with the lowest purchase price.
    #[value(name = "min_costo")]
    MinCost,
    /// Average the purchase and sale prices.
    Avg,
}

impl DedupPolicy {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::First => "first",
            Self::MaxSale => "max_venta",
            Self::MinCost => "min_costo",
            Self::Avg => "avg",
        }
    }
}

impl Display for DedupPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DedupPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first" => Ok(Self::First),
            "max_venta" => Ok(Self::MaxSale),
            "min_costo" => Ok(Self::MinCost),
            "avg" => Ok(Self::Avg),
            _ => Err(Error::UnknownPolicy(s.to_string())),
        }
    }
}

/// The deduplicated catalog: exactly one entry per normalized product name.
#[derive(Debug, Default)]
pub struct PriceList(BTreeMap<String, CatalogEntry>);

impl PriceList {
    /// Returns the entry for the normalized product name `key`, if any.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&CatalogEntry> {
        self.0.get(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Collapses `entries` to one entry per normalized key.
///
/// Entries whose key appears once are kept as is. When every duplicate
/// carries the same prices, the first one is kept whatever the policy.
/// Otherwise `policy` decides; ties under [`DedupPolicy::MaxSale`] and
/// [`DedupPolicy::MinCost`] go to the earliest entry.
#[must_use]
pub fn deduplicate(entries: &[CatalogEntry], policy: DedupPolicy) -> PriceList {
    let mut groups: BTreeMap<&str, Vec<&CatalogEntry>> = BTreeMap::new();
    for entry in entries {
        groups.entry(entry.key.as_str()).or_default().push(entry);
    }
    PriceList(
        groups
            .into_iter()
            .filter_map(|(key, group)| Some((key.to_string(), resolve(&group, policy)?)))
            .collect(),
    )
}

fn resolve(group: &[&CatalogEntry], policy: DedupPolicy) -> Option<CatalogEntry> {
    let first = *group.first()?;
    let same_prices = group.iter().all(|e| {
        e.purchase_price == first.purchase_price && e.sale_price == first.sale_price
    });
    if same_prices {
        return Some(first.clone());
    }
    debug!(
        key = %first.key,
        duplicates = group.len(),
        %policy,
        "resolving conflicting catalog prices"
    );
    let chosen = match policy {
        DedupPolicy::First => first.clone(),
        DedupPolicy::MaxSale => group
            .iter()
            .copied()
            .reduce(|best, e| if e.sale_price > best.sale_price { e } else { best })?
            .clone(),
        DedupPolicy::MinCost => group
            .iter()
            .copied()
            .reduce(|best, e| {
                if e.purchase_price < best.purchase_price {
                    e
                } else {
                    best
                }
            })?
            .clone(),
        DedupPolicy::Avg => {
            let count = Decimal::from(group.len());
            let mean = |price: fn(&CatalogEntry) -> Money| {
                let amounts = group.iter().map(|e| price(e).amount());
                let total = amounts.clone().try_fold(Decimal::ZERO, Decimal::checked_add);
                Money::new(match total {
                    Some(total) => total / count,
                    // Prices near the Decimal limit: divide before summing.
                    None => amounts
                        .map(|amount| amount / count)
                        .fold(Decimal::ZERO, Decimal::saturating_add),
                })
            };
            CatalogEntry {
                name: first.name.clone(),
                key: first.key.clone(),
                purchase_price: mean(|e| e.purchase_price),
                sale_price: mean(|e| e.sale_price),
            }
        }
    };
    Some(chosen)
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn entry(name: &str, purchase: Decimal, sale: Decimal) -> CatalogEntry {
        CatalogEntry::new(name, Money::new(purchase), Money::new(sale)).unwrap()
    }

    fn duplicates() -> Vec<CatalogEntry> {
        vec![
            entry("Perfume A", dec!(10), dec!(20)),
            entry("Perfume B", dec!(15), dec!(30)),
            entry("perfume a", dec!(8), dec!(22)),
            entry("PERFUME A ", dec!(12), dec!(22)),
            entry("Perfume C", dec!(5), dec!(9)),
        ]
    }

    #[test]
    fn deduplicate_fn_keeps_one_entry_per_key_for_every_policy() {
        for policy in DedupPolicy::value_variants() {
            let prices = deduplicate(&duplicates(), *policy);
            assert_eq!(prices.len(), 3, "policy {policy}");
            assert!(deduplicate(&[], *policy).is_empty());
            assert!(prices.get("PERFUME A").is_some());
            assert_eq!(prices.get("PERFUME B").unwrap().sale_price, Money::new(dec!(30)));
        }
    }

    #[test]
    fn first_policy_keeps_first_occurrence() {
        let prices = deduplicate(&duplicates(), DedupPolicy::First);
        let a = prices.get("PERFUME A").unwrap();
        assert_eq!(a.name, "Perfume A");
        assert_eq!(a.purchase_price, Money::new(dec!(10)));
    }

    #[test]
    fn max_venta_policy_keeps_highest_sale_price_earliest_on_tie() {
        let prices = deduplicate(&duplicates(), DedupPolicy::MaxSale);
        let a = prices.get("PERFUME A").unwrap();
        assert_eq!(a.sale_price, Money::new(dec!(22)));
        assert_eq!(a.purchase_price, Money::new(dec!(8)));
    }

    #[test]
    fn min_costo_policy_keeps_lowest_purchase_price() {
        let prices = deduplicate(&duplicates(), DedupPolicy::MinCost);
        let a = prices.get("PERFUME A").unwrap();
        assert_eq!(a.purchase_price, Money::new(dec!(8)));
        assert_eq!(a.name, "perfume a");
    }

    #[test]
    fn avg_policy_averages_prices_under_first_name() {
        let prices = deduplicate(&duplicates(), DedupPolicy::Avg);
        let a = prices.get("PERFUME A").unwrap();
        assert_eq!(a.name, "Perfume A");
        assert_eq!(a.purchase_price, Money::new(dec!(10)));
        assert_eq!(a.sale_price, Money::new(dec!(64) / dec!(3)));
    }

    #[test]
    fn avg_policy_survives_prices_near_decimal_limit() {
        let entries = vec![
            entry("Perfume A", Decimal::MAX, Decimal::MAX),
            entry("perfume a", Decimal::MAX, dec!(0)),
        ];
        let prices = deduplicate(&entries, DedupPolicy::Avg);
        let a = prices.get("PERFUME A").unwrap();
        assert_eq!(a.sale_price, Money::new(Decimal::MAX / dec!(2)));
    }

    #[test]
    fn identical_duplicates_keep_first_whatever_the_policy() {
        let entries = vec![
            entry("Perfume A", dec!(10), dec!(20)),
            entry("perfume a", dec!(10.00), dec!(20.0)),
        ];
        let prices = deduplicate(&entries, DedupPolicy::Avg);
        assert_eq!(prices.get("PERFUME A").unwrap().name, "Perfume A");
    }

    #[test]
    fn from_str_fn_rejects_unknown_policy() {
        assert_eq!("max_venta".parse::<DedupPolicy>(), Ok(DedupPolicy::MaxSale));
        assert_eq!(
            "cheapest".parse::<DedupPolicy>(),
            Err(Error::UnknownPolicy("cheapest".into()))
        );
    }

    #[test]
    fn policy_names_round_trip_through_display() {
        for policy in DedupPolicy::value_variants() {
            assert_eq!(policy.to_string().parse::<DedupPolicy>(), Ok(*policy));
        }
    }
}
