use crate::domain::model::MergedReport;
use crate::domain::ports::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    /// Extract + transform only. Nothing is written.
    pub async fn preview(&self) -> Result<MergedReport> {
        tracing::info!("Extracting warehouse exports...");
        let datasets = self.pipeline.extract().await?;
        tracing::info!(
            "Extracted {} + {} articles",
            datasets.first.len(),
            datasets.second.len()
        );
        self.monitor.log_stats("Extract");

        tracing::info!("Reconciling...");
        let report = self.pipeline.transform(datasets).await?;
        self.monitor.log_stats("Transform");

        Ok(report)
    }

    pub async fn run(&self) -> Result<P::Summary> {
        tracing::info!("Starting reconciliation run...");

        let report = self.preview().await?;

        // Load
        tracing::info!("Writing {} articles to templates...", report.len());
        let summary = self.pipeline.load(report).await?;
        self.monitor.log_stats("Load");
        self.monitor.log_final_stats();

        Ok(summary)
    }
}
