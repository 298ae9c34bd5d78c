pub mod etl;
pub mod normalizer;
pub mod pipeline;
pub mod projector;
pub mod protected;
pub mod reconcile;

pub use crate::domain::model::{MergedReport, SourceDatasets};
pub use crate::domain::ports::{ConfigProvider, Pipeline, SourceProvider, Storage};
pub use crate::utils::error::Result;
