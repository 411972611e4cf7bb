//! Coordinate Resolver - postal code -> WGS84 coordinate via the local lookup dataset
//!
//! The dataset is a directory of headerless CSV partitions, one per postcode
//! prefix (`sw.csv`, `ec.csv`, ...), each row `code, <unused>, easting, northing, ...`.

use crate::coordinate::{Coordinate, GridTransform};
use crate::error::Result;
use crate::postcode::{lookup_key, PostalCode};
use csv::ReaderBuilder;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// A postal code with its resolved coordinate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedEntry {
    pub postcode: PostalCode,
    pub coordinate: Coordinate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotFoundReason {
    EmptyPrefix,
    InvalidPrefix { prefix: String },
    MissingPartition { prefix: String },
    UnreadablePartition { prefix: String, reason: String },
    NoMatch,
    MalformedRecord,
    TransformFailed(String),
}

impl fmt::Display for NotFoundReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotFoundReason::EmptyPrefix => write!(f, "postcode has no alphabetic prefix"),
            NotFoundReason::InvalidPrefix { prefix } => {
                write!(f, "prefix {:?} is not a valid partition key", prefix)
            }
            NotFoundReason::MissingPartition { prefix } => {
                write!(f, "no data file for prefix {}", prefix)
            }
            NotFoundReason::UnreadablePartition { prefix, reason } => {
                write!(f, "data file for prefix {} is unreadable: {}", prefix, reason)
            }
            NotFoundReason::NoMatch => write!(f, "postcode not found in database"),
            NotFoundReason::MalformedRecord => write!(f, "easting/northing could not be parsed"),
            NotFoundReason::TransformFailed(reason) => write!(f, "transform failed: {}", reason),
        }
    }
}

/// Per-code lookup miss. Routed to the invalid table, never fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotFound {
    pub postcode: PostalCode,
    pub reason: NotFoundReason,
}

impl fmt::Display for NotFound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.postcode, self.reason)
    }
}

pub type Resolution = std::result::Result<ResolvedEntry, NotFound>;

/// Anything that can turn a raw postal code into a coordinate.
pub trait Resolve {
    fn resolve(&mut self, raw: &str) -> Resolution;
}

/// Read-only lookup dataset shared by every invocation.
pub struct LookupDataset {
    data_dir: PathBuf,
    transform: GridTransform,
}

impl LookupDataset {
    pub fn open(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        if !data_dir.is_dir() {
            warn!("Postcode data directory {} does not exist", data_dir.display());
        }
        Ok(Self {
            data_dir,
            transform: GridTransform::british_national_grid()?,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Path of the partition file for `prefix`, or `None` when the prefix is not
    /// a valid partition key and must not be joined onto the data directory.
    pub fn partition_path(&self, prefix: &str) -> Option<PathBuf> {
        is_partition_key(prefix).then(|| self.data_dir.join(format!("{}.csv", prefix.to_lowercase())))
    }

    /// Open a resolver with its own partition cache for one batch.
    pub fn batch(self: &Arc<Self>) -> CoordinateResolver {
        CoordinateResolver::new(Arc::clone(self))
    }

    fn read_partition(&self, path: &Path) -> std::result::Result<Partition, csv::Error> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)?;

        let mut rows = HashMap::new();
        for (line, result) in rdr.byte_records().enumerate() {
            let record = result?;
            if record.len() < 4 {
                continue;
            }
            // a bad byte only costs its own row
            let fields = (
                std::str::from_utf8(&record[0]),
                std::str::from_utf8(&record[2]),
                std::str::from_utf8(&record[3]),
            );
            let (code, easting, northing) = match fields {
                (Ok(code), Ok(easting), Ok(northing)) => (code, easting, northing),
                _ => {
                    debug!("Skipping non UTF-8 row {} in {}", line + 1, path.display());
                    continue;
                }
            };
            let key = lookup_key(code);
            let grid = match (easting.trim().parse::<f64>(), northing.trim().parse::<f64>()) {
                (Ok(easting), Ok(northing)) => Some((easting, northing)),
                _ => None,
            };
            // first occurrence wins
            rows.entry(key).or_insert(grid);
        }
        Ok(Partition { rows })
    }
}

/// UK outward-code prefixes are one or two letters; only ASCII letters may
/// name a file under the data directory.
pub fn is_partition_key(prefix: &str) -> bool {
    !prefix.is_empty() && prefix.chars().all(|c| c.is_ascii_alphabetic())
}

/// Parsed contents of one prefix file: lookup key -> (easting, northing).
struct Partition {
    rows: HashMap<String, Option<(f64, f64)>>,
}

enum CachedPartition {
    Loaded(Partition),
    Missing,
    Unreadable(String),
}

/// Resolver for a single batch; partitions are read at most once per batch.
pub struct CoordinateResolver {
    dataset: Arc<LookupDataset>,
    cache: HashMap<String, CachedPartition>,
}

impl CoordinateResolver {
    pub fn new(dataset: Arc<LookupDataset>) -> Self {
        Self {
            dataset,
            cache: HashMap::new(),
        }
    }

    /// Number of distinct partitions touched so far in this batch.
    pub fn partitions_cached(&self) -> usize {
        self.cache.len()
    }

    fn partition(&mut self, prefix: &str) -> &CachedPartition {
        let key = prefix.to_lowercase();
        let dataset = &self.dataset;
        self.cache.entry(key).or_insert_with(|| {
            let path = match dataset.partition_path(prefix) {
                Some(path) => path,
                None => return CachedPartition::Missing,
            };
            if !path.is_file() {
                debug!("No data file found for prefix {} at {}", prefix, path.display());
                return CachedPartition::Missing;
            }
            debug!("Reading postcode data from {}", path.display());
            match dataset.read_partition(&path) {
                Ok(partition) => CachedPartition::Loaded(partition),
                Err(e) => {
                    warn!("Failed to read {}: {}", path.display(), e);
                    CachedPartition::Unreadable(e.to_string())
                }
            }
        })
    }
}

impl Resolve for CoordinateResolver {
    fn resolve(&mut self, raw: &str) -> Resolution {
        let postcode = PostalCode::new(raw);
        let prefix = postcode.prefix();
        let miss = |postcode: PostalCode, reason| Err(NotFound { postcode, reason });

        if prefix.trim().is_empty() {
            return miss(postcode, NotFoundReason::EmptyPrefix);
        }
        if !is_partition_key(&prefix) {
            return miss(postcode, NotFoundReason::InvalidPrefix { prefix });
        }

        let grid = match self.partition(&prefix) {
            CachedPartition::Missing => {
                return miss(postcode, NotFoundReason::MissingPartition { prefix })
            }
            CachedPartition::Unreadable(reason) => {
                let reason = reason.clone();
                return miss(postcode, NotFoundReason::UnreadablePartition { prefix, reason });
            }
            CachedPartition::Loaded(partition) => partition.rows.get(&postcode.lookup_key()).copied(),
        };

        let (easting, northing) = match grid {
            None => return miss(postcode, NotFoundReason::NoMatch),
            Some(None) => return miss(postcode, NotFoundReason::MalformedRecord),
            Some(Some(grid)) => grid,
        };

        match self.dataset.transform.to_wgs84(easting, northing) {
            Ok(coordinate) => Ok(ResolvedEntry {
                postcode: PostalCode::new(&postcode.lookup_key()),
                coordinate,
            }),
            Err(reason) => miss(postcode, NotFoundReason::TransformFailed(reason)),
        }
    }
}
