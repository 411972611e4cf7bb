pub mod assembler;
pub mod config;
pub mod coordinate;
pub mod error;
pub mod export;
pub mod loader;
pub mod map_renderer;
pub mod partitioner;
pub mod pipeline;
pub mod postcode;
pub mod resolver;

pub use assembler::{assemble, InvalidTable, ResultRow, ResultTable};
pub use config::PipelineConfig;
pub use coordinate::Coordinate;
pub use error::{ClusterError, Result};
pub use map_renderer::{MapArtifact, MapRenderer};
pub use partitioner::{GroupId, KMeansPartitioner, Partitioner};
pub use pipeline::{ClusteringPipeline, PipelineOutput};
pub use postcode::PostalCode;
pub use resolver::{CoordinateResolver, LookupDataset, NotFound, NotFoundReason, Resolve};
