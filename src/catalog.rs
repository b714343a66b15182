use anyhow::{bail, Context, Result};
use calamine::{open_workbook_auto, Data, Reader};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{info, warn};

use std::{path::Path, str::FromStr};

use crate::{
    error::{Error, RowError},
    money::Money,
    normalize::{normalize_header, normalize_key},
    table::{self, require_column},
};

/// Name of the catalog sheet read when no other is given.
pub const DEFAULT_SHEET: &str = "PERFUMES";

const PRODUCT: &[&str] = &["producto", "product"];
const PURCHASE_PRICE: &[&str] = &["precio compra", "purchase price"];
const SALE_PRICE: &[&str] = &["precio venta", "sale price"];

static EMPTY: Data = Data::Empty;

/// One product row of the price catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub name: String,
    pub key: String,
    pub purchase_price: Money,
    pub sale_price: Money,
}

impl CatalogEntry {
    /// Creates an entry, deriving its matching key from `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if `name` is blank or either price is negative.
    pub fn new(name: &str, purchase_price: Money, sale_price: Money) -> Result<Self> {
        let key = normalize_key(name);
        if key.is_empty() {
            bail!("empty product name");
        }
        if purchase_price.is_negative() {
            bail!("negative purchase price {purchase_price}");
        }
        if sale_price.is_negative() {
            bail!("negative sale price {sale_price}");
        }
        Ok(Self {
            name: name.trim().to_string(),
            key,
            purchase_price,
            sale_price,
        })
    }
}

/// Catalog rows in file order, before deduplication.
#[derive(Debug, Default)]
pub struct Catalog {
    pub entries: Vec<CatalogEntry>,
    pub rejected: Vec<RowError>,
}

#[derive(Debug, Deserialize)]
struct Record {
    #[serde(rename = "producto")]
    name: String,
    #[serde(rename = "precio compra")]
    purchase_price: Money,
    #[serde(rename = "precio venta")]
    sale_price: Money,
}

impl Catalog {
    /// Reads the catalog at `path`.
    ///
    /// Files with a `.csv` extension are read with [`Self::read_csv`];
    /// anything else is treated as a spreadsheet workbook and read with
    /// [`Self::read_workbook`] from the sheet named `sheet`.
    ///
    /// # Errors
    ///
    /// Returns any errors from the underlying reader.
    pub fn load(path: impl AsRef<Path>, sheet: &str) -> Result<Self> {
        let path = path.as_ref();
        let is_csv = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        let catalog = if is_csv {
            Self::read_csv(path)?
        } else {
            Self::read_workbook(path, sheet)?
        };
        for err in &catalog.rejected {
            warn!("skipping catalog row: {err}");
        }
        info!(
            path = %path.display(),
            entries = catalog.entries.len(),
            rejected = catalog.rejected.len(),
            "loaded catalog"
        );
        Ok(catalog)
    }

    /// Reads catalog data from the sheet `sheet` of the workbook at `path`.
    ///
    /// The first row of the sheet holds the column headers. Any format
    /// supported by [`calamine`] (XLSX, XLSM, XLS, ODS) is accepted.
    ///
    /// # Errors
    ///
    /// Returns errors if:
    /// * The workbook cannot be opened
    /// * There is no sheet named `sheet`
    /// * A required column is missing
    pub fn read_workbook(path: impl AsRef<Path>, sheet: &str) -> Result<Self> {
        let path = path.as_ref();
        let mut workbook =
            open_workbook_auto(path).with_context(|| format!("opening {}", path.display()))?;
        if !workbook.sheet_names().iter().any(|name| name == sheet) {
            return Err(Error::MissingSheet {
                path: path.to_path_buf(),
                sheet: sheet.to_string(),
            }
            .into());
        }
        let range = workbook
            .worksheet_range(sheet)
            .with_context(|| format!("reading sheet {sheet:?} of {}", path.display()))?;

        let mut rows = range.rows();
        let headers: Vec<String> = rows
            .next()
            .unwrap_or_default()
            .iter()
            .map(|cell| normalize_header(&cell.to_string()))
            .collect();
        let product = require_column(&headers, PRODUCT, path)?;
        let purchase = require_column(&headers, PURCHASE_PRICE, path)?;
        let sale = require_column(&headers, SALE_PRICE, path)?;

        let header_line = range.start().map_or(1, |(row, _)| u64::from(row) + 1);
        let mut catalog = Self::default();
        for (line, row) in (header_line + 1..).zip(rows) {
            if row.iter().all(is_blank) {
                continue;
            }
            let cell = |idx: usize| row.get(idx).unwrap_or(&EMPTY);
            let entry = cell_money(cell(purchase)).and_then(|purchase_price| {
                let sale_price = cell_money(cell(sale))?;
                CatalogEntry::new(&cell(product).to_string(), purchase_price, sale_price)
            });
            catalog.push(path, line, entry);
        }
        Ok(catalog)
    }

    /// Reads catalog data from the CSV file at `path`.
    ///
    /// # Errors
    ///
    /// Returns errors if the file cannot be opened or read, or a required
    /// column is missing.
    pub fn read_csv(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let rows = table::read_csv::<Record>(path, &[PRODUCT, PURCHASE_PRICE, SALE_PRICE])?;
        let mut catalog = Self {
            entries: Vec::new(),
            rejected: rows.rejected,
        };
        for (line, record) in rows.rows {
            let entry = CatalogEntry::new(&record.name, record.purchase_price, record.sale_price);
            catalog.push(path, line, entry);
        }
        Ok(catalog)
    }

    fn push(&mut self, path: &Path, line: u64, entry: Result<CatalogEntry>) {
        match entry {
            Ok(entry) => self.entries.push(entry),
            Err(err) => self
                .rejected
                .push(RowError::new(path, line, format!("{err:#}"))),
        }
    }
}

fn is_blank(cell: &Data) -> bool {
    match cell {
        Data::Empty => true,
        Data::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

// Float cells go through their shortest decimal representation, so a price
// typed as 19.99 stays exactly 19.99.
fn cell_money(cell: &Data) -> Result<Money> {
    match cell {
        Data::Int(n) => Ok(Money::new(Decimal::from(*n))),
        Data::Float(n) => Money::from_str(&n.to_string()),
        Data::String(s) => Money::from_str(s),
        Data::Empty => bail!("missing price"),
        other => bail!("not a price: {other}"),
    }
}
