//! CSV exports as raw records.
//!
//! The header row supplies the raw key names, so any of the upstream field
//! variants (`date`/`timestamp`, `label`/`description`/`merchant`, ...) can
//! appear as columns. Cells stay strings; empty cells are omitted.

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::io::Read;
use std::path::Path;

pub fn parse_csv_records<R: Read>(reader: R) -> Result<Vec<Value>> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers().context("reading CSV header")?.clone();
    let mut out = Vec::new();

    for (i, result) in rdr.records().enumerate() {
        let record = result.with_context(|| format!("reading CSV row {}", i + 1))?;
        let mut row = Map::new();
        for (key, cell) in headers.iter().zip(record.iter()) {
            if key.is_empty() || cell.is_empty() {
                continue;
            }
            row.insert(key.to_string(), Value::String(cell.to_string()));
        }
        if !row.is_empty() {
            out.push(Value::Object(row));
        }
    }

    Ok(out)
}

pub fn parse_csv_file(path: impl AsRef<Path>) -> Result<Vec<Value>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).with_context(|| format!("opening {}", path.display()))?;
    parse_csv_records(file).with_context(|| format!("parsing {}", path.display()))
}
