#![doc = include_str!("../README.md")]
use anyhow::Result;
use tracing::info;

use std::path::Path;

pub mod catalog;
pub mod dedup;
pub mod error;
pub mod export;
pub mod logging;
pub mod money;
pub mod normalize;
pub mod order;
pub mod report;
pub mod summary;
mod table;

pub use catalog::{Catalog, CatalogEntry, DEFAULT_SHEET};
pub use dedup::{deduplicate, DedupPolicy, PriceList};
pub use error::{Error, RowError};
pub use order::{Order, OrderLine};
pub use report::{ComputedLine, Report};
pub use summary::Summary;

/// Prices the order at `order_path` against the catalog at `catalog_path`.
///
/// The catalog is read from `sheet` (ignored for CSV catalogs) and
/// deduplicated with `policy`. Rows skipped from either file end up in
/// [`Report::rejected`].
///
/// # Errors
///
/// Returns errors if either file cannot be read, or lacks a required column
/// or sheet.
pub fn calculate(
    catalog_path: impl AsRef<Path>,
    order_path: impl AsRef<Path>,
    policy: DedupPolicy,
    sheet: &str,
) -> Result<Report> {
    let order_path = order_path.as_ref();
    let catalog = Catalog::load(catalog_path, sheet)?;
    let order = Order::read_csv(order_path)?;
    let prices = deduplicate(&catalog.entries, policy);
    info!(
        %policy,
        products = prices.len(),
        duplicates = catalog.entries.len() - prices.len(),
        "deduplicated catalog"
    );
    let mut report = Report::compute(order.lines, &prices, order_path);
    let mut rejected = catalog.rejected;
    rejected.extend(order.rejected);
    rejected.append(&mut report.rejected);
    report.rejected = rejected;
    Ok(report)
}
