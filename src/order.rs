use anyhow::{bail, Result};
use serde::Deserialize;
use tracing::{info, warn};

use std::path::Path;

use crate::{
    error::RowError,
    money::{Discount, Quantity},
    normalize::normalize_key,
    table,
};

const PRODUCT: &[&str] = &["producto", "product"];
const QUANTITY: &[&str] = &["cantidad", "quantity"];
const DISCOUNT: &[&str] = &["descuento_%", "descuento", "discount"];

/// One line of the order being priced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLine {
    pub name: String,
    pub key: String,
    pub quantity: Quantity,
    pub discount: Discount,
    /// 1-based line in the order file, or 0 for lines built in memory.
    pub line: u64,
}

impl OrderLine {
    /// # Errors
    ///
    /// Returns an error if `name` is blank.
    pub fn new(name: &str, quantity: Quantity, discount: Discount) -> Result<Self> {
        let key = normalize_key(name);
        if key.is_empty() {
            bail!("empty product name");
        }
        Ok(Self {
            name: name.trim().to_string(),
            key,
            quantity,
            discount,
            line: 0,
        })
    }
}

/// Defines the CSV format for order data.
#[derive(Debug, Deserialize)]
struct Record {
    #[serde(rename = "producto")]
    name: String,
    #[serde(rename = "cantidad")]
    quantity: Quantity,
    #[serde(rename = "descuento_%")]
    discount: Discount,
}

/// Order lines in file order.
#[derive(Debug, Default)]
pub struct Order {
    pub lines: Vec<OrderLine>,
    pub rejected: Vec<RowError>,
}

impl Order {
    /// Reads order data from the CSV file at `path`.
    ///
    /// The file needs product, quantity and discount columns (`producto`,
    /// `cantidad`, `descuento_%`, or their English names). Header case and
    /// spacing don't matter. Rows with a malformed quantity or discount are
    /// skipped and recorded in [`Order::rejected`].
    ///
    /// # Errors
    ///
    /// Returns errors if the file cannot be opened or read, or a required
    /// column is missing.
    pub fn read_csv(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let rows = table::read_csv::<Record>(path, &[PRODUCT, QUANTITY, DISCOUNT])?;
        let mut order = Self {
            lines: Vec::new(),
            rejected: rows.rejected,
        };
        for (line, record) in rows.rows {
            match OrderLine::new(&record.name, record.quantity, record.discount) {
                Ok(order_line) => order.lines.push(OrderLine { line, ..order_line }),
                Err(err) => order.rejected.push(RowError::new(path, line, err)),
            }
        }
        for err in &order.rejected {
            warn!("skipping order row: {err}");
        }
        info!(
            path = %path.display(),
            lines = order.lines.len(),
            rejected = order.rejected.len(),
            "loaded order"
        );
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use rust_decimal_macros::dec;

    use super::*;
    use crate::error::Error;

    #[test]
    fn read_csv_fn_correctly_parses_order_data() {
        let order = Order::read_csv("testdata/pedido.csv").unwrap();
        assert_eq!(order.lines.len(), 5, "wrong lines");
        let first = &order.lines[0];
        assert_eq!(first.key, "PERFUME A");
        assert_eq!(first.quantity.get(), 3);
        assert_eq!(first.discount.fraction(), dec!(0.10));
        assert_eq!(first.line, 2);
        assert_eq!(order.lines[1].discount, Discount::default());
        assert_eq!(order.lines[3].quantity.get(), 1);
    }

    #[test]
    fn read_csv_fn_skips_and_reports_malformed_rows() {
        let order = Order::read_csv("testdata/pedido.csv").unwrap();
        let lines: Vec<u64> = order.rejected.iter().map(|e| e.line).collect();
        assert_eq!(lines, vec![6, 7, 8]);
        assert!(
            order.rejected[1].message.contains("invalid quantity"),
            "{}",
            order.rejected[1]
        );
    }

    #[test]
    fn read_csv_fn_returns_missing_column_error() {
        let err = Order::read_csv("testdata/pedido.bad.csv").unwrap_err();
        assert_eq!(
            err.downcast_ref::<Error>(),
            Some(&Error::MissingColumn {
                path: "testdata/pedido.bad.csv".into(),
                column: "descuento_%",
            })
        );
    }

    #[test]
    fn order_line_new_fn_rejects_blank_name() {
        let qty = Quantity::from_str("1").unwrap();
        assert!(OrderLine::new(" \t", qty, Discount::default()).is_err());
    }
}
