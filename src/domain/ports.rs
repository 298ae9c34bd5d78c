use crate::domain::model::{MergeKey, MergedReport, PricingRule, SourceDatasets};
use crate::domain::table::{ColumnLayout, ResetScope};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::PathBuf;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn rename_file(
        &self,
        from: &str,
        to: &str,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn remove_file(&self, path: &str) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Upstream collaborator that delivers the warehouse exports (mailbox,
/// download folder, explicit paths...).
#[async_trait]
pub trait SourceProvider: Send + Sync {
    async fn source_files(&self) -> Result<Vec<PathBuf>>;
}

/// Where a template is read from and where its projection is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateTarget {
    pub template: String,
    pub output: String,
    pub layout: ColumnLayout,
}

pub trait ConfigProvider: Send + Sync {
    fn output_path(&self) -> &str;
    fn protected_articles_path(&self) -> Option<&str>;
    fn stock_target(&self) -> TemplateTarget;
    fn price_target(&self) -> TemplateTarget;
    fn reset_scope(&self) -> ResetScope;
    fn merge_key(&self) -> MergeKey;
    fn pricing(&self) -> PricingRule;
    fn report_json(&self) -> Option<String>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    type Summary: Send;

    async fn extract(&self) -> Result<SourceDatasets>;
    async fn transform(&self, data: SourceDatasets) -> Result<MergedReport>;
    async fn load(&self, report: MergedReport) -> Result<Self::Summary>;
}
