use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use log::info;

/// File name offered when a results table is downloaded.
pub const DEFAULT_EXPORT_NAME: &str = "results.csv";

/// A header row plus numeric data rows, as rendered in the result tables.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExportTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl ExportTable {
    pub fn new(headers: &[&str], rows: Vec<Vec<f64>>) -> Self {
        ExportTable {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows,
        }
    }
}

/// Quote a CSV field if it contains a comma, quote or newline.
fn escape_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Convert a table to CSV.
///
/// The header row comes first, then one line per data row; lines are joined
/// with `\n` and there is no trailing newline.
///
/// # Examples
/// ```
/// use aspenlog::downloader::{ExportTable, to_csv};
///
/// let table = ExportTable::new(&["Height Zone", "p"], vec![vec![1.0, 0.25]]);
/// assert_eq!(to_csv(&table), "Height Zone,p\n1,0.25");
/// ```
pub fn to_csv(table: &ExportTable) -> String {
    let mut lines = Vec::with_capacity(table.rows.len() + 1);

    lines.push(
        table
            .headers
            .iter()
            .map(|h| escape_field(h))
            .collect::<Vec<_>>()
            .join(","),
    );

    for row in &table.rows {
        lines.push(
            row.iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(","),
        );
    }

    lines.join("\n")
}

/// Convert a table to XLSX bytes: headers in the first row, data below.
#[cfg(feature = "web")]
pub fn to_xlsx(table: &ExportTable) -> Result<Vec<u8>, Box<dyn Error>> {
    use rust_xlsxwriter::{Workbook, Worksheet};

    let mut workbook = Workbook::new();
    let mut worksheet = Worksheet::new();

    for (c, header) in table.headers.iter().enumerate() {
        worksheet.write_string(0, c as u16, header)?;
    }

    for (r, row) in table.rows.iter().enumerate() {
        for (c, value) in row.iter().enumerate() {
            worksheet.write_number((r + 1) as u32, c as u16, *value)?;
        }
    }

    workbook.push_worksheet(worksheet);
    let buffer = workbook.save_to_buffer()?;

    Ok(buffer)
}

/// Write exported bytes into `dir`, returning the path written.
/// `name` must be a bare file name.
pub fn write_export(dir: impl AsRef<Path>, name: &str, bytes: &[u8]) -> Result<PathBuf, Box<dyn Error>> {
    let file_name = Path::new(name)
        .file_name()
        .filter(|f| f.len() == name.len())
        .ok_or_else(|| format!("Invalid export file name: {}", name))?;

    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    let path = dir.join(file_name);
    fs::write(&path, bytes)?;
    info!("exported {} bytes to {}", bytes.len(), path.display());

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_with_commas_are_quoted() {
        let table = ExportTable::new(
            &["Wind Pressure, kPa, 1/50 (q)", "Latitude"],
            vec![vec![0.34, 43.661], vec![0.4, -79.0]],
        );
        assert_eq!(
            to_csv(&table),
            "\"Wind Pressure, kPa, 1/50 (q)\",Latitude\n0.34,43.661\n0.4,-79"
        );
    }

    #[test]
    fn empty_table_is_just_headers() {
        let table = ExportTable::new(&["Height Zone"], Vec::new());
        assert_eq!(to_csv(&table), "Height Zone");
    }

    #[test]
    fn write_export_rejects_paths() {
        let dir = tempfile::tempdir().unwrap();
        assert!(write_export(dir.path(), "../escape.csv", b"x").is_err());
        let path = write_export(dir.path(), DEFAULT_EXPORT_NAME, b"a,b").unwrap();
        assert_eq!(fs::read(path).unwrap(), b"a,b");
    }

    #[cfg(feature = "web")]
    #[test]
    fn xlsx_is_a_zip_archive() {
        let table = ExportTable::new(&["Height Zone", "p"], vec![vec![1.0, 0.5]]);
        let bytes = to_xlsx(&table).unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }
}
