use anyhow::{bail, Context};
use rust_decimal::{prelude::ToPrimitive, Decimal, RoundingStrategy};
use serde_with::{DeserializeFromStr, SerializeDisplay};

use std::{
    fmt::{Debug, Display},
    str::FromStr,
};

/// Represents an amount of money.
///
/// The amount is stored internally as an exact [`Decimal`], so sums and
/// products never pick up floating-point drift, but the [`Display`]
/// implementation rounds it (half away from zero) to 2 decimal places.
#[derive(
    Clone, Copy, Default, DeserializeFromStr, SerializeDisplay, Eq, PartialEq, Ord, PartialOrd,
)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    #[must_use]
    pub fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Returns the exact, unrounded amount.
    #[must_use]
    pub fn amount(self) -> Decimal {
        self.0
    }

    /// Returns the amount rounded to whole cents.
    #[must_use]
    pub fn rounded(self) -> Decimal {
        self.0
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    }

    #[must_use]
    pub fn is_negative(self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    /// Returns this amount with `discount` taken off.
    ///
    /// # Examples
    ///
    /// ```
    /// # use std::str::FromStr;
    /// # use pedido::money::{Discount, Money};
    /// let price = Money::from_str("20").unwrap();
    /// let discount = Discount::from_str("0.10").unwrap();
    /// assert_eq!(price.discounted(discount), Money::from_str("18").unwrap());
    /// ```
    #[must_use]
    pub fn discounted(self, discount: Discount) -> Self {
        Self(self.0 * (Decimal::ONE - discount.0))
    }

    /// Returns `self + rhs`, or `None` on overflow.
    #[must_use]
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    /// Returns `self - rhs`, or `None` on overflow.
    #[must_use]
    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(Self)
    }

    /// Returns the amount for `quantity` units at this price, or `None` on
    /// overflow.
    #[must_use]
    pub fn checked_mul(self, quantity: Quantity) -> Option<Self> {
        self.0.checked_mul(Decimal::from(quantity.0)).map(Self)
    }

    /// Returns `self / whole`, or `None` if `whole` is zero.
    #[must_use]
    pub fn ratio_of(self, whole: Money) -> Option<Decimal> {
        self.0.checked_div(whole.0)
    }
}

impl Debug for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(&format!("{:.2}", self.rounded()))
    }
}

impl FromStr for Money {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let cleaned = s.trim().replace(['$', ',', ' '], "");
        if cleaned.is_empty() {
            bail!("missing amount");
        }
        let amount =
            Decimal::from_str(&cleaned).with_context(|| format!("invalid amount {s:?}"))?;
        Ok(Self(amount))
    }
}

/// Number of units ordered. Always greater than zero.
#[derive(Clone, Copy, Debug, DeserializeFromStr, SerializeDisplay, Eq, PartialEq)]
pub struct Quantity(u32);

impl Quantity {
    /// # Errors
    ///
    /// Returns an error if `units` is zero.
    pub fn new(units: u32) -> anyhow::Result<Self> {
        if units == 0 {
            bail!("quantity must be greater than zero");
        }
        Ok(Self(units))
    }

    #[must_use]
    pub fn get(self) -> u32 {
        self.0
    }
}

impl Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl FromStr for Quantity {
    type Err = anyhow::Error;

    // Spreadsheet exports often write whole numbers as "3.0".
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let value =
            Decimal::from_str(s.trim()).with_context(|| format!("invalid quantity {s:?}"))?;
        if !value.fract().is_zero() {
            bail!("quantity {s:?} is not a whole number");
        }
        let units = value
            .to_u32()
            .with_context(|| format!("quantity {s:?} out of range"))?;
        Self::new(units)
    }
}

/// A discount expressed as a fraction of the sale price, in `[0, 1)`.
#[derive(Clone, Copy, Debug, Default, DeserializeFromStr, SerializeDisplay, Eq, PartialEq)]
pub struct Discount(Decimal);

impl Discount {
    /// # Errors
    ///
    /// Returns an error if `fraction` lies outside `[0, 1)`.
    pub fn new(fraction: Decimal) -> anyhow::Result<Self> {
        if (fraction.is_sign_negative() && !fraction.is_zero()) || fraction >= Decimal::ONE {
            bail!("discount {fraction} outside [0, 1)");
        }
        Ok(Self(fraction))
    }

    #[must_use]
    pub fn fraction(self) -> Decimal {
        self.0
    }
}

impl Display for Discount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0.normalize(), f)
    }
}

impl FromStr for Discount {
    type Err = anyhow::Error;

    /// An empty cell means no discount.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(Self::default());
        }
        let fraction = Decimal::from_str(s).with_context(|| format!("invalid discount {s:?}"))?;
        Self::new(fraction)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn money_from_str_fn_accepts_currency_symbol_and_thousands_separator() {
        assert_eq!(Money::from_str("$1,234.50").unwrap(), Money::new(dec!(1234.50)));
        assert_eq!(Money::from_str(" 20 ").unwrap(), Money::new(dec!(20)));
        assert!(Money::from_str("").is_err());
        assert!(Money::from_str("twenty").is_err());
    }

    #[test]
    fn money_display_rounds_half_away_from_zero_to_cents() {
        assert_eq!(Money::new(dec!(2.005)).to_string(), "2.01");
        assert_eq!(Money::new(dec!(-2.005)).to_string(), "-2.01");
        assert_eq!(Money::new(dec!(18)).to_string(), "18.00");
        assert_eq!(format!("{:>8}", Money::new(dec!(5.5))), "    5.50");
    }

    #[test]
    fn money_arithmetic_is_exact() {
        let tenth = Money::new(dec!(0.1));
        let total = (0..10).try_fold(Money::ZERO, |sum, _| sum.checked_add(tenth));
        assert_eq!(total, Some(Money::new(dec!(1))));
        assert_eq!(
            Money::new(dec!(18)).checked_mul(Quantity::new(3).unwrap()),
            Some(Money::new(dec!(54)))
        );
        assert_eq!(
            Money::new(dec!(54)).checked_sub(Money::new(dec!(30))),
            Some(Money::new(dec!(24)))
        );
    }

    #[test]
    fn checked_fns_return_none_on_overflow() {
        let huge = Money::new(dec!(20000000000000000000));
        assert_eq!(huge.checked_mul(Quantity::new(4_000_000_000).unwrap()), None);
        assert_eq!(Money::new(Decimal::MAX).checked_add(Money::new(dec!(1))), None);
        assert_eq!(Money::new(Decimal::MIN).checked_sub(Money::new(dec!(1))), None);
    }

    #[test]
    fn ratio_of_fn_returns_none_for_zero_whole() {
        assert_eq!(Money::new(dec!(1)).ratio_of(Money::ZERO), None);
        assert_eq!(
            Money::new(dec!(24)).ratio_of(Money::new(dec!(54))),
            Some(dec!(24) / dec!(54))
        );
    }

    #[test]
    fn quantity_from_str_fn_accepts_only_positive_whole_numbers() {
        assert_eq!(Quantity::from_str("3").unwrap().get(), 3);
        assert_eq!(Quantity::from_str("3.0").unwrap().get(), 3);
        assert!(Quantity::from_str("0").is_err());
        assert!(Quantity::from_str("-2").is_err());
        assert!(Quantity::from_str("2.5").is_err());
        assert!(Quantity::from_str("two").is_err());
    }

    #[test]
    fn discount_from_str_fn_enforces_fraction_range() {
        assert_eq!(Discount::from_str("").unwrap(), Discount::default());
        assert_eq!(Discount::from_str("0.25").unwrap().fraction(), dec!(0.25));
        assert!(Discount::from_str("0").is_ok());
        assert!(Discount::from_str("1").is_err());
        assert!(Discount::from_str("-0.1").is_err());
        assert!(Discount::from_str("10%").is_err());
    }
}
