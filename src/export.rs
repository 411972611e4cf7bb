//! Tabular export of a run: the two-sheet workbook, CSV copies of its sheets
//! and a JSON run summary

use crate::assembler::{InvalidTable, ResultTable};
use crate::error::{ClusterError, Result};
use chrono::{DateTime, Utc};
use itertools::Itertools;
use polars::prelude::*;
use rust_xlsxwriter::{Workbook, XlsxError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const VALID_FILE: &str = "valid_postcodes.csv";
pub const INVALID_FILE: &str = "invalid_postcodes.csv";
pub const SUMMARY_FILE: &str = "run.json";
pub const WORKBOOK_FILE: &str = "postcodes.xlsx";
pub const VALID_SHEET: &str = "Valid Postcodes";
pub const INVALID_SHEET: &str = "Invalid Postcodes";

const VALID_HEADERS: [&str; 4] = ["Postcode", "Latitude", "Longitude", "Group"];
const INVALID_HEADER: &str = "Invalid_Postcodes";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub num_groups: usize,
    pub total_rows: usize,
    pub valid_count: usize,
    pub invalid_count: usize,
    /// Group id -> number of postcodes
    pub group_sizes: BTreeMap<usize, usize>,
}

impl RunSummary {
    pub fn new(run_id: Uuid, num_groups: usize, result: &ResultTable, invalid: &InvalidTable) -> Self {
        let group_sizes = result
            .rows()
            .iter()
            .map(|r| r.group)
            .counts()
            .into_iter()
            .collect();

        Self {
            run_id,
            generated_at: Utc::now(),
            num_groups,
            total_rows: result.len() + invalid.len(),
            valid_count: result.len(),
            invalid_count: invalid.len(),
            group_sizes,
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(df)
        .map_err(|e| ClusterError::Export(format!("Failed to write {}: {}", path.display(), e)))
}

/// Write `valid_postcodes.csv` and `invalid_postcodes.csv` into `dir`.
pub fn write_tables(dir: &Path, result: &ResultTable, invalid: &InvalidTable) -> Result<(PathBuf, PathBuf)> {
    std::fs::create_dir_all(dir)?;

    let valid_path = dir.join(VALID_FILE);
    write_csv(&mut result.to_dataframe()?, &valid_path)?;

    let invalid_path = dir.join(INVALID_FILE);
    write_csv(&mut invalid.to_dataframe()?, &invalid_path)?;

    Ok((valid_path, invalid_path))
}

fn xlsx_error(path: &Path) -> impl Fn(XlsxError) -> ClusterError + '_ {
    move |e| ClusterError::Export(format!("Failed to write {}: {}", path.display(), e))
}

/// Write `postcodes.xlsx` into `dir` with one sheet per table.
pub fn write_workbook(dir: &Path, result: &ResultTable, invalid: &InvalidTable) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(WORKBOOK_FILE);
    let err = xlsx_error(&path);

    let mut workbook = Workbook::new();

    let sheet = workbook.add_worksheet();
    sheet.set_name(VALID_SHEET).map_err(&err)?;
    for (col, header) in VALID_HEADERS.iter().enumerate() {
        sheet.write_string(0, col as u16, *header).map_err(&err)?;
    }
    for (i, row) in result.rows().iter().enumerate() {
        let r = i as u32 + 1;
        sheet.write_string(r, 0, &row.postcode).map_err(&err)?;
        sheet.write_number(r, 1, row.latitude).map_err(&err)?;
        sheet.write_number(r, 2, row.longitude).map_err(&err)?;
        sheet.write_number(r, 3, row.group as f64).map_err(&err)?;
    }

    let sheet = workbook.add_worksheet();
    sheet.set_name(INVALID_SHEET).map_err(&err)?;
    sheet.write_string(0, 0, INVALID_HEADER).map_err(&err)?;
    for (i, postcode) in invalid.postcodes().iter().enumerate() {
        sheet.write_string(i as u32 + 1, 0, postcode).map_err(&err)?;
    }

    workbook.save(&path).map_err(&err)?;
    drop(err);
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::ResultRow;

    fn result_table() -> ResultTable {
        ResultTable::from_rows(vec![
            ResultRow { postcode: "SW1A1AA".into(), latitude: 51.501, longitude: -0.141, group: 1 },
            ResultRow { postcode: "EC1A1BB".into(), latitude: 51.520, longitude: -0.098, group: 0 },
            ResultRow { postcode: "SW1A2AA".into(), latitude: 51.503, longitude: -0.127, group: 1 },
        ])
    }

    #[test]
    fn test_summary_counts_groups() {
        let summary = RunSummary::new(Uuid::new_v4(), 2, &result_table(), &InvalidTable::default());
        assert_eq!(summary.valid_count, 3);
        assert_eq!(summary.invalid_count, 0);
        assert_eq!(summary.group_sizes.get(&0), Some(&1));
        assert_eq!(summary.group_sizes.get(&1), Some(&2));
    }

    #[test]
    fn test_write_tables() {
        let dir = tempfile::tempdir().unwrap();
        let (valid, invalid) = write_tables(dir.path(), &result_table(), &InvalidTable::default()).unwrap();

        let valid = std::fs::read_to_string(valid).unwrap();
        let mut lines = valid.lines();
        assert_eq!(lines.next(), Some("Postcode,Latitude,Longitude,Group"));
        assert!(lines.next().unwrap().starts_with("SW1A1AA,51.501"));
        assert_eq!(valid.lines().count(), 4);

        let invalid = std::fs::read_to_string(invalid).unwrap();
        assert_eq!(invalid.lines().next(), Some("Invalid_Postcodes"));
    }

    #[test]
    fn test_workbook_has_both_sheets() {
        use calamine::{open_workbook, Reader, Xlsx};

        let dir = tempfile::tempdir().unwrap();
        let invalid = InvalidTable::from_postcodes(vec!["ZZ99 9ZZ".into(), "nope".into()]);
        let path = write_workbook(dir.path(), &result_table(), &invalid).unwrap();
        assert_eq!(path.file_name().unwrap(), WORKBOOK_FILE);

        let mut workbook: Xlsx<_> = open_workbook(&path).unwrap();
        assert_eq!(workbook.sheet_names(), vec![VALID_SHEET.to_string(), INVALID_SHEET.to_string()]);

        let valid = workbook.worksheet_range(VALID_SHEET).unwrap();
        let rows: Vec<Vec<String>> = valid
            .rows()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0], vec!["Postcode", "Latitude", "Longitude", "Group"]);
        assert_eq!(rows[1][0], "SW1A1AA");
        assert_eq!(rows[1][3], "1");
        assert_eq!(rows[2][0], "EC1A1BB");

        let invalid = workbook.worksheet_range(INVALID_SHEET).unwrap();
        let rows: Vec<String> = invalid.rows().map(|r| r[0].to_string()).collect();
        assert_eq!(rows, vec!["Invalid_Postcodes", "ZZ99 9ZZ", "nope"]);
    }
}
