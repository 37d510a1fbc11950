//! Company catalog files: plain-text name lists in, symbol CSVs out.

use std::fs;
use std::path::Path;

use crate::domain::error::LedgerError;

fn catalog_err(reason: String) -> LedgerError {
    LedgerError::Catalog { reason }
}

/// Read a catalog of company names, one per line. Whitespace is trimmed and
/// blank lines are skipped. Names keep their punctuation, commas included, so
/// the file is read as lines rather than as delimited records.
pub fn read_company_names<P: AsRef<Path>>(path: P) -> Result<Vec<String>, LedgerError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .map_err(|e| catalog_err(format!("failed to read {}: {}", path.display(), e)))?;

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Write assigned symbols as a two-column CSV with a header row.
pub fn write_symbol_catalog<P: AsRef<Path>>(
    path: P,
    entries: &[(String, String)],
) -> Result<(), LedgerError> {
    let path = path.as_ref();
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| catalog_err(format!("failed to create {}: {}", path.display(), e)))?;

    writer
        .write_record(["Company Name", "Ticker"])
        .map_err(|e| catalog_err(format!("CSV write error: {}", e)))?;
    for (name, ticker) in entries {
        writer
            .write_record([name.as_str(), ticker.as_str()])
            .map_err(|e| catalog_err(format!("CSV write error: {}", e)))?;
    }

    writer
        .flush()
        .map_err(|e| catalog_err(format!("CSV write error: {}", e)))?;
    Ok(())
}
