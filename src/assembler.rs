//! Result Assembler - drives resolution and partitioning into the two output tables

use crate::error::{ClusterError, Result};
use crate::partitioner::{GroupId, Partitioner};
use crate::resolver::{ResolvedEntry, Resolve};
use polars::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRow {
    pub postcode: String,
    pub latitude: f64,
    pub longitude: f64,
    pub group: GroupId,
}

/// Resolved postcodes with their group, in resolution order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResultTable {
    rows: Vec<ResultRow>,
}

impl ResultTable {
    pub fn from_rows(rows: Vec<ResultRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[ResultRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Columns `Postcode, Latitude, Longitude, Group`.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let postcodes: Vec<&str> = self.rows.iter().map(|r| r.postcode.as_str()).collect();
        let latitudes: Vec<f64> = self.rows.iter().map(|r| r.latitude).collect();
        let longitudes: Vec<f64> = self.rows.iter().map(|r| r.longitude).collect();
        let groups: Vec<u32> = self.rows.iter().map(|r| r.group as u32).collect();

        Ok(df![
            "Postcode" => postcodes,
            "Latitude" => latitudes,
            "Longitude" => longitudes,
            "Group" => groups
        ]?)
    }
}

/// Postcodes that could not be resolved, as given in the input.
#[derive(Debug, Clone, Default, Serialize)]
pub struct InvalidTable {
    postcodes: Vec<String>,
}

impl InvalidTable {
    pub fn from_postcodes(postcodes: Vec<String>) -> Self {
        Self { postcodes }
    }

    pub fn postcodes(&self) -> &[String] {
        &self.postcodes
    }

    pub fn len(&self) -> usize {
        self.postcodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.postcodes.is_empty()
    }

    /// Single column `Invalid_Postcodes`.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let postcodes: Vec<&str> = self.postcodes.iter().map(String::as_str).collect();
        Ok(df!["Invalid_Postcodes" => postcodes]?)
    }
}

/// Resolve every raw code, then partition the resolved set once.
///
/// Fails with `InsufficientData` before touching the partitioner when fewer
/// than `k` codes resolve.
pub fn assemble<R, P>(
    raw_codes: &[String],
    resolver: &mut R,
    partitioner: &P,
    k: usize,
) -> Result<(ResultTable, InvalidTable)>
where
    R: Resolve + ?Sized,
    P: Partitioner + ?Sized,
{
    info!("Converting postcodes to coordinates...");
    let mut resolved: Vec<ResolvedEntry> = Vec::new();
    let mut invalid = InvalidTable::default();

    for raw in raw_codes {
        match resolver.resolve(raw) {
            Ok(entry) => resolved.push(entry),
            Err(miss) => {
                debug!("Could not find coordinates for postcode {}", miss);
                invalid.postcodes.push(raw.trim().to_string());
            }
        }
    }

    info!(
        "Successfully got coordinates for {} out of {} postcodes",
        resolved.len(),
        raw_codes.len()
    );

    if k == 0 || resolved.len() < k {
        return Err(ClusterError::InsufficientData {
            resolved: resolved.len(),
            requested: k,
        });
    }

    let coordinates: Vec<_> = resolved.iter().map(|e| e.coordinate).collect();
    let groups = partitioner.partition(&coordinates, k)?;
    if groups.len() != resolved.len() {
        return Err(ClusterError::Config(format!(
            "partitioner returned {} assignments for {} coordinates",
            groups.len(),
            resolved.len()
        )));
    }

    let rows = resolved
        .into_iter()
        .zip(groups)
        .map(|(entry, group)| ResultRow {
            postcode: entry.postcode.as_str().to_string(),
            latitude: entry.coordinate.latitude,
            longitude: entry.coordinate.longitude,
            group,
        })
        .collect();

    let result = ResultTable::from_rows(rows);
    info!("Final table has {} rows, {} invalid postcodes", result.len(), invalid.len());
    Ok((result, invalid))
}
