//! Clustering pipeline - one invocation from input file to artifacts
//!
//! Load -> Resolve -> Partition -> Assemble -> Render. Each run gets its own
//! id and partition cache; artifacts land in `<output_dir>/<run_id>/`.

use crate::assembler::{assemble, InvalidTable, ResultTable};
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::export::{self, RunSummary, SUMMARY_FILE};
use crate::loader::BatchLoader;
use crate::map_renderer::{MapArtifact, MapRenderer};
use crate::partitioner::KMeansPartitioner;
use crate::resolver::LookupDataset;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

pub const MAP_FILE: &str = "map.html";

pub struct ClusteringPipeline {
    config: PipelineConfig,
    dataset: Arc<LookupDataset>,
    partitioner: KMeansPartitioner,
    renderer: MapRenderer,
}

/// Everything one run produced.
pub struct PipelineOutput {
    pub run_id: Uuid,
    pub result: ResultTable,
    pub invalid: InvalidTable,
    pub map: MapArtifact,
    pub summary: RunSummary,
}

/// Where a run's artifacts were written.
#[derive(Debug, Clone)]
pub struct RunArtifacts {
    pub dir: PathBuf,
    pub map: PathBuf,
    pub workbook: PathBuf,
    pub valid: PathBuf,
    pub invalid: PathBuf,
    pub summary: PathBuf,
}

impl ClusteringPipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let dataset = Arc::new(LookupDataset::open(&config.data_dir)?);
        Ok(Self::with_dataset(config, dataset))
    }

    /// Share an already-open dataset between pipelines.
    pub fn with_dataset(config: PipelineConfig, dataset: Arc<LookupDataset>) -> Self {
        let partitioner = KMeansPartitioner::new(config.seed)
            .with_max_iter(config.max_iter)
            .with_n_init(config.n_init);
        Self {
            config,
            dataset,
            partitioner,
            renderer: MapRenderer::default(),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn dataset(&self) -> &Arc<LookupDataset> {
        &self.dataset
    }

    pub fn run(&self, input: impl AsRef<Path>) -> Result<PipelineOutput> {
        let raw_codes = BatchLoader::load(input)?;
        self.run_codes(&raw_codes)
    }

    /// Run over codes that were already loaded.
    pub fn run_codes(&self, raw_codes: &[String]) -> Result<PipelineOutput> {
        let run_id = Uuid::new_v4();
        info!("Starting run {} with {} postcodes", run_id, raw_codes.len());

        let mut resolver = self.dataset.batch();
        let (result, invalid) = assemble(raw_codes, &mut resolver, &self.partitioner, self.config.num_groups)?;
        let map = self.renderer.render(&result);
        let summary = RunSummary::new(run_id, self.config.num_groups, &result, &invalid);

        Ok(PipelineOutput {
            run_id,
            result,
            invalid,
            map,
            summary,
        })
    }
}

impl PipelineOutput {
    /// Write map, tables and summary into `<output_root>/<run_id>/`.
    pub fn write_artifacts(&self, output_root: impl AsRef<Path>) -> Result<RunArtifacts> {
        let dir = output_root.as_ref().join(self.run_id.to_string());
        std::fs::create_dir_all(&dir)?;

        let map = dir.join(MAP_FILE);
        self.map.save(&map)?;
        info!("Map saved to {}", map.display());

        let workbook = export::write_workbook(&dir, &self.result, &self.invalid)?;
        let (valid, invalid) = export::write_tables(&dir, &self.result, &self.invalid)?;
        info!("Grouped and invalid postcodes saved to {}", dir.display());

        let summary = dir.join(SUMMARY_FILE);
        self.summary.save(&summary)?;

        Ok(RunArtifacts {
            dir,
            map,
            workbook,
            valid,
            invalid,
            summary,
        })
    }
}
