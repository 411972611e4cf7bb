//! Batch Loader - reads the single-column postcode list

use crate::error::{ClusterError, Result};
use csv::ReaderBuilder;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::info;

pub struct BatchLoader;

impl BatchLoader {
    /// Read raw postcode tokens from a headerless CSV file, in row order.
    ///
    /// Rows whose first cell is empty or whitespace-only are dropped. Any further columns are ignored.
    pub fn load(path: impl AsRef<Path>) -> Result<Vec<String>> {
        let path = path.as_ref();
        info!("Reading file: {}", path.display());

        let file = File::open(path).map_err(|e| ClusterError::Load {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let codes = Self::load_from_reader(file).map_err(|e| match e {
            ClusterError::Load { reason, .. } => ClusterError::Load {
                path: path.to_path_buf(),
                reason,
            },
            other => other,
        })?;

        info!("Found {} postcodes", codes.len());
        Ok(codes)
    }

    pub fn load_from_reader<R: Read>(reader: R) -> Result<Vec<String>> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut codes = Vec::new();
        for (row, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| ClusterError::Load {
                path: Default::default(),
                reason: format!("row {}: {}", row + 1, e),
            })?;
            match record.get(0).map(str::trim) {
                Some(cell) if !cell.is_empty() => codes.push(cell.to_string()),
                _ => {}
            }
        }
        Ok(codes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preserves_order_and_drops_empty_rows() {
        let input = "SW1A 1AA\n\nEC1A 1BB\n  \nZZ99 9ZZ\nSW1A 1AA\n";
        let codes = BatchLoader::load_from_reader(input.as_bytes()).unwrap();
        assert_eq!(codes, vec!["SW1A 1AA", "EC1A 1BB", "ZZ99 9ZZ", "SW1A 1AA"]);
    }

    #[test]
    fn test_empty_quoted_cell_is_dropped() {
        let input = "\"\"\nN1 9GU\n";
        let codes = BatchLoader::load_from_reader(input.as_bytes()).unwrap();
        assert_eq!(codes, vec!["N1 9GU"]);
    }

    #[test]
    fn test_whitespace_only_cell_is_dropped() {
        let input = "\t\n\"   \"\n \t ,extra\nN1 9GU\n";
        let codes = BatchLoader::load_from_reader(input.as_bytes()).unwrap();
        assert_eq!(codes, vec!["N1 9GU"]);
    }

    #[test]
    fn test_missing_file_is_load_error() {
        let err = BatchLoader::load("/definitely/not/here.csv").unwrap_err();
        assert!(matches!(err, ClusterError::Load { .. }));
    }

    #[test]
    fn test_invalid_utf8_is_load_error() {
        let input: &[u8] = b"SW1A 1AA\n\xff\xfe\n";
        let err = BatchLoader::load_from_reader(input).unwrap_err();
        assert!(matches!(err, ClusterError::Load { .. }));
    }
}
