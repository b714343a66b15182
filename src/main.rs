use anyhow::Result;
use chrono::Local;
use clap::Parser;

use std::path::PathBuf;

use pedido::{export, logging, DedupPolicy, DEFAULT_SHEET};

/// Computes revenue, cost, profit and weighted margin for an order, using
/// prices from a catalog.
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Catalog workbook (columns: producto, precio compra, precio venta), or a CSV with the same columns
    #[arg(long = "catalogo", visible_alias = "catalog", value_name = "PATH")]
    catalog: PathBuf,
    /// Order CSV (columns: producto, cantidad, descuento_% as a 0..1 fraction)
    #[arg(long = "pedido", visible_alias = "order", value_name = "PATH")]
    order: PathBuf,
    /// How to resolve catalog products listed more than once with different prices
    #[arg(long, value_enum, default_value_t)]
    dedup: DedupPolicy,
    /// Catalog sheet to read
    #[arg(long, default_value = DEFAULT_SHEET)]
    sheet: String,
    /// Write detail and summary files (CSV and XLSX)
    #[arg(long)]
    export: bool,
    /// Directory for exported files
    #[arg(long, default_value = ".", value_name = "DIR")]
    out_dir: PathBuf,
    /// Log more detail
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.verbose);
    let report = pedido::calculate(&args.catalog, &args.order, args.dedup, &args.sheet)?;
    print!("{report}");
    if args.export {
        let prefix = export::file_prefix(&args.out_dir, &Local::now());
        let paths = export::export(&report, &prefix)?;
        println!();
        println!("Exported:");
        for path in paths {
            println!(" - {}", path.display());
        }
    }
    Ok(())
}
