use crate::error::{ClusterError, Result};
use std::path::PathBuf;
use std::str::FromStr;

/// Settings for one pipeline instance.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory holding one `<prefix>.csv` lookup file per postcode prefix
    pub data_dir: PathBuf,
    /// Root under which each run writes its own artifact directory
    pub output_dir: PathBuf,
    pub num_groups: usize,
    /// Centroid initialization seed
    pub seed: u64,
    pub max_iter: usize,
    pub n_init: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data/Data/CSV"),
            output_dir: PathBuf::from("output"),
            num_groups: 8,
            seed: 42,
            max_iter: 300,
            n_init: 1,
        }
    }
}

impl PipelineConfig {
    /// Defaults overridden by `POSTCODE_*` environment variables (a `.env` file is honoured).
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let mut config = Self::default();
        if let Ok(dir) = std::env::var("POSTCODE_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = std::env::var("POSTCODE_OUTPUT_DIR") {
            config.output_dir = PathBuf::from(dir);
        }
        if let Some(n) = env_parse("POSTCODE_NUM_GROUPS")? {
            config.num_groups = n;
        }
        if let Some(seed) = env_parse("POSTCODE_SEED")? {
            config.seed = seed;
        }
        if let Some(max_iter) = env_parse("POSTCODE_MAX_ITER")? {
            config.max_iter = max_iter;
        }
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_groups == 0 {
            return Err(ClusterError::Config("number of groups must be at least 1".to_string()));
        }
        if self.max_iter == 0 {
            return Err(ClusterError::Config("max_iter must be at least 1".to_string()));
        }
        if self.n_init == 0 {
            return Err(ClusterError::Config("n_init must be at least 1".to_string()));
        }
        Ok(())
    }
}

fn env_parse<T: FromStr>(key: &str) -> Result<Option<T>> {
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ClusterError::Config(format!("{} has invalid value '{}'", key, value))),
        Err(_) => Ok(None),
    }
}
