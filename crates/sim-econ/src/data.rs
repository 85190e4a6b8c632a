//! Historical price tables on disk.
//!
//! One CSV per instrument, `date,close` rows with ISO dates in strictly
//! ascending order. Loading is strict: a malformed row, an out-of-order
//! date, or a non-positive close aborts the load with a typed error.

use chrono::NaiveDate;
use serde::Deserialize;
use sim_core::Instrument;
use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::fs::{self, File};
use std::io;
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading historical price tables.
#[derive(Debug, Error)]
pub enum PriceDataError {
    /// The underlying file could not be opened or read.
    #[error("price table io: {0}")]
    Io(#[from] io::Error),
    /// A row failed to parse.
    #[error("price table csv: {0}")]
    Csv(#[from] csv::Error),
    /// The table contained no rows.
    #[error("price table is empty")]
    EmptyTable,
    /// Dates must be strictly ascending.
    #[error("row {row}: date {date} is not after the previous row")]
    OutOfOrderDate {
        /// 1-based data row index.
        row: usize,
        /// The offending date.
        date: NaiveDate,
    },
    /// Closes must be strictly positive and finite.
    #[error("row {row}: close {close} is not a positive finite number")]
    InvalidClose {
        /// 1-based data row index.
        row: usize,
        /// The offending close.
        close: f64,
    },
    /// A preloaded market needs a table for every instrument.
    #[error("no price table for {0}")]
    MissingInstrument(Instrument),
    /// Two files in the table directory name the same instrument.
    #[error("more than one price table for {0}")]
    DuplicateTable(Instrument),
}

/// One `date,close` row of a price table.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct PriceRow {
    /// Trading date.
    pub date: NaiveDate,
    /// Closing price in dollars.
    pub close: f64,
}

/// Read and validate a close table from any reader.
pub fn read_close_table<R: io::Read>(reader: R) -> Result<Vec<PriceRow>, PriceDataError> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut rows: Vec<PriceRow> = Vec::new();
    for (idx, record) in csv_reader.deserialize::<PriceRow>().enumerate() {
        let row = record?;
        if !row.close.is_finite() || row.close <= 0.0 {
            return Err(PriceDataError::InvalidClose {
                row: idx + 1,
                close: row.close,
            });
        }
        if let Some(prev) = rows.last() {
            if row.date <= prev.date {
                return Err(PriceDataError::OutOfOrderDate {
                    row: idx + 1,
                    date: row.date,
                });
            }
        }
        rows.push(row);
    }
    if rows.is_empty() {
        return Err(PriceDataError::EmptyTable);
    }
    Ok(rows)
}

/// Load a close table from a CSV file.
pub fn load_close_table(path: &Path) -> Result<Vec<PriceRow>, PriceDataError> {
    let file = File::open(path)?;
    read_close_table(file)
}

/// Scan `dir` for one `.csv` table per instrument. Stems resolve through
/// [`Instrument::from_name`], so `Apple.csv` and `world.CSV` both load; files
/// naming no instrument are ignored. Every instrument must be covered, each
/// by exactly one file.
pub fn load_price_tables(
    dir: &Path,
) -> Result<BTreeMap<Instrument, Vec<PriceRow>>, PriceDataError> {
    let mut tables = BTreeMap::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let Some(instrument) = instrument_for_stem(&path) else {
            continue;
        };
        if tables.insert(instrument, load_close_table(&path)?).is_some() {
            return Err(PriceDataError::DuplicateTable(instrument));
        }
    }
    for instrument in Instrument::ALL {
        if !tables.contains_key(&instrument) {
            return Err(PriceDataError::MissingInstrument(instrument));
        }
    }
    Ok(tables)
}

/// The instrument a table file carries, judged by its `.csv` stem.
fn instrument_for_stem(path: &Path) -> Option<Instrument> {
    let is_csv = path
        .extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    if !is_csv {
        return None;
    }
    path.file_stem()
        .and_then(OsStr::to_str)
        .and_then(Instrument::from_name)
}
