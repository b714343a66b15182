use anyhow::{Context, Result};
use csv::WriterBuilder;
use chrono::{DateTime, TimeZone};
use rust_decimal::{prelude::ToPrimitive, Decimal, RoundingStrategy};
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use serde::Serialize;
use tracing::info;

use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

use crate::{
    money::{Discount, Money, Quantity},
    report::{ComputedLine, Report},
    summary::Summary,
};

const DETAIL: &str = "detalle";
const SUMMARY: &str = "resumen";
const UNMATCHED: &str = "sin_match";

const DETAIL_COLUMNS: [&str; 10] = [
    "product",
    "quantity",
    "discount",
    "sale_price",
    "effective_unit_price",
    "purchase_price",
    "revenue",
    "cost",
    "profit",
    "line_margin",
];
const SUMMARY_COLUMNS: [&str; 4] = [
    "total_revenue",
    "total_cost",
    "total_profit",
    "weighted_margin",
];
const UNMATCHED_COLUMNS: [&str; 3] = ["product", "quantity", "discount"];

/// Returns the output file prefix for a run started at `at`, e.g.
/// `out/salida_20250131_174502`.
pub fn file_prefix<Tz: TimeZone>(dir: impl AsRef<Path>, at: &DateTime<Tz>) -> PathBuf
where
    Tz::Offset: std::fmt::Display,
{
    dir.as_ref()
        .join(format!("salida_{}", at.format("%Y%m%d_%H%M%S")))
}

/// Writes `report` to CSV files and one XLSX workbook named after `prefix`.
///
/// Produces `<prefix>_detalle.csv`, `<prefix>_resumen.csv`,
/// `<prefix>_sin_match.csv` and `<prefix>.xlsx`, the last holding one sheet
/// for each. Returns the paths written.
///
/// # Errors
///
/// Returns any errors from creating or writing the files.
pub fn export(report: &Report, prefix: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let prefix = prefix.as_ref();
    let details: Vec<DetailRow> = report.lines.iter().map(DetailRow::from).collect();
    let summary = [SummaryRow::from(&report.summary)];
    let unmatched: Vec<UnmatchedRow> = report
        .unmatched
        .iter()
        .map(|line| UnmatchedRow {
            product: &line.name,
            quantity: line.quantity,
            discount: line.discount,
        })
        .collect();

    let paths = vec![
        write_csv(
            &with_suffix(prefix, &format!("_{DETAIL}.csv")),
            &DETAIL_COLUMNS,
            &details,
        )?,
        write_csv(
            &with_suffix(prefix, &format!("_{SUMMARY}.csv")),
            &SUMMARY_COLUMNS,
            &summary,
        )?,
        write_csv(
            &with_suffix(prefix, &format!("_{UNMATCHED}.csv")),
            &UNMATCHED_COLUMNS,
            &unmatched,
        )?,
        write_workbook(&with_suffix(prefix, ".xlsx"), report)?,
    ];
    for path in &paths {
        info!(path = %path.display(), "exported");
    }
    Ok(paths)
}

fn with_suffix(prefix: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(prefix.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

// The header is written up front so files with no rows still carry it.
fn write_csv<T: Serialize>(path: &Path, headers: &[&str], rows: &[T]) -> Result<PathBuf> {
    let mut wtr = WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    wtr.write_record(headers)
        .with_context(|| format!("writing {}", path.display()))?;
    for row in rows {
        wtr.serialize(row)
            .with_context(|| format!("writing {}", path.display()))?;
    }
    wtr.flush()
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(path.to_path_buf())
}

fn ratio(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(4, RoundingStrategy::MidpointAwayFromZero)
}

/// Defines the CSV format for priced order lines.
#[derive(Debug, Serialize)]
struct DetailRow<'a> {
    product: &'a str,
    quantity: Quantity,
    discount: Discount,
    sale_price: Money,
    effective_unit_price: Money,
    purchase_price: Money,
    revenue: Money,
    cost: Money,
    profit: Money,
    line_margin: Option<Decimal>,
}

impl<'a> From<&'a ComputedLine> for DetailRow<'a> {
    fn from(line: &'a ComputedLine) -> Self {
        Self {
            product: &line.order.name,
            quantity: line.order.quantity,
            discount: line.order.discount,
            sale_price: line.sale_price,
            effective_unit_price: line.effective_unit_price,
            purchase_price: line.purchase_price,
            revenue: line.revenue,
            cost: line.cost,
            profit: line.profit,
            line_margin: line.margin.map(ratio),
        }
    }
}

#[derive(Debug, Serialize)]
struct SummaryRow {
    total_revenue: Money,
    total_cost: Money,
    total_profit: Money,
    weighted_margin: Decimal,
}

impl From<&Summary> for SummaryRow {
    fn from(summary: &Summary) -> Self {
        Self {
            total_revenue: summary.total_revenue,
            total_cost: summary.total_cost,
            total_profit: summary.total_profit,
            weighted_margin: ratio(summary.weighted_margin),
        }
    }
}

#[derive(Debug, Serialize)]
struct UnmatchedRow<'a> {
    product: &'a str,
    quantity: Quantity,
    discount: Discount,
}

struct Formats {
    header: Format,
    money: Format,
    percent: Format,
}

fn number(value: Decimal) -> f64 {
    value.to_f64().unwrap_or_default()
}

fn money(value: Money) -> f64 {
    number(value.rounded())
}

fn write_headers(sheet: &mut Worksheet, headers: &[&str], formats: &Formats) -> Result<()> {
    for (col, header) in (0u16..).zip(headers) {
        sheet.write_string_with_format(0, col, *header, &formats.header)?;
    }
    Ok(())
}

fn write_workbook(path: &Path, report: &Report) -> Result<PathBuf> {
    let formats = Formats {
        header: Format::new().set_bold(),
        money: Format::new().set_num_format("#,##0.00"),
        percent: Format::new().set_num_format("0.0%"),
    };
    let mut workbook = Workbook::new();

    let sheet = workbook.add_worksheet().set_name(DETAIL)?;
    write_headers(sheet, &DETAIL_COLUMNS, &formats)?;
    for (row, line) in (1u32..).zip(&report.lines) {
        sheet.write_string(row, 0, line.order.name.as_str())?;
        sheet.write_number(row, 1, line.order.quantity.get())?;
        sheet.write_number_with_format(
            row,
            2,
            number(line.order.discount.fraction()),
            &formats.percent,
        )?;
        let amounts = [
            line.sale_price,
            line.effective_unit_price,
            line.purchase_price,
            line.revenue,
            line.cost,
            line.profit,
        ];
        for (col, amount) in (3u16..).zip(amounts) {
            sheet.write_number_with_format(row, col, money(amount), &formats.money)?;
        }
        if let Some(margin) = line.margin {
            sheet.write_number_with_format(row, 9, number(ratio(margin)), &formats.percent)?;
        }
    }

    let sheet = workbook.add_worksheet().set_name(SUMMARY)?;
    write_headers(sheet, &SUMMARY_COLUMNS, &formats)?;
    let summary = &report.summary;
    for (col, amount) in (0u16..).zip([
        summary.total_revenue,
        summary.total_cost,
        summary.total_profit,
    ]) {
        sheet.write_number_with_format(1, col, money(amount), &formats.money)?;
    }
    sheet.write_number_with_format(
        1,
        3,
        number(ratio(summary.weighted_margin)),
        &formats.percent,
    )?;

    let sheet = workbook.add_worksheet().set_name(UNMATCHED)?;
    write_headers(sheet, &UNMATCHED_COLUMNS, &formats)?;
    for (row, line) in (1u32..).zip(&report.unmatched) {
        sheet.write_string(row, 0, line.name.as_str())?;
        sheet.write_number(row, 1, line.quantity.get())?;
        sheet.write_number_with_format(row, 2, number(line.discount.fraction()), &formats.percent)?;
    }

    workbook
        .save(path)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(path.to_path_buf())
}
