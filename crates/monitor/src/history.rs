//! Historical dataset loading
//!
//! Reads aggregated buckets from CSV. Only the `status` and `count`
//! columns are used; any other columns (timestamps, auth codes) are ignored.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use csv::ReaderBuilder;
use monitor_lib::HistoricalRecord;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct HistoryRow {
    status: String,
    count: u64,
}

/// Load historical records from a CSV file
pub fn load_history<P: AsRef<Path>>(path: P) -> Result<Vec<HistoricalRecord>> {
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open history file {}", path.display()))?;
    read_history(file).with_context(|| format!("Failed to read history file {}", path.display()))
}

/// Parse historical records from any CSV source
pub fn read_history<R: Read>(reader: R) -> Result<Vec<HistoricalRecord>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut records = Vec::new();
    for (line, row) in reader.deserialize::<HistoryRow>().enumerate() {
        let row = row.with_context(|| format!("Invalid history row {}", line + 2))?;
        records.push(HistoricalRecord::new(&row.status, row.count));
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_load_history_ignores_extra_columns() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("transactions.csv");
        let mut file = File::create(&path)?;
        writeln!(file, "time,status,count")?;
        writeln!(file, "00h 00,approved,120")?;
        writeln!(file, "00h 00,failed,2")?;
        writeln!(file, "00h 01, denied ,3")?;

        let records = load_history(&path)?;
        assert_eq!(records.len(), 3);
        assert_eq!(records[0], HistoricalRecord::new("APPROVED", 120));
        assert_eq!(records[2].status, "DENIED");
        Ok(())
    }

    #[test]
    fn test_negative_count_is_an_error() {
        let data = "status,count\nfailed,-4\n";
        let err = read_history(data.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("row 2"));
    }

    #[test]
    fn test_missing_file() {
        assert!(load_history("/nonexistent/transactions.csv").is_err());
    }

    #[test]
    fn test_header_only_yields_empty_history() -> Result<()> {
        let records = read_history("status,count\n".as_bytes())?;
        assert!(records.is_empty());
        Ok(())
    }
}
