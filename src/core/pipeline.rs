use crate::adapters::spreadsheet::{read_table, write_table, TableFormat};
use crate::core::normalizer::load_dataset;
use crate::core::projector::{project_price, project_stock, ProjectionSummary};
use crate::core::protected::ProtectedArticles;
use crate::core::reconcile::Reconciler;
use crate::domain::model::{MergedReport, SourceDatasets};
use crate::domain::ports::{ConfigProvider, Pipeline, SourceProvider, Storage, TemplateTarget};
use crate::domain::table::Template;
use crate::utils::error::{EtlError, Result};
use serde::Serialize;
use std::io::ErrorKind;
use std::path::Path;

const PARTIAL_SUFFIX: &str = ".partial";
const BACKUP_SUFFIX: &str = ".bak";

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub articles: usize,
    pub stock_output: String,
    pub price_output: String,
    pub report_json: Option<String>,
    pub stock: ProjectionSummary,
    pub price: ProjectionSummary,
}

/// A projection serialized and ready to be written.
struct Rendered {
    path: String,
    bytes: Vec<u8>,
    summary: ProjectionSummary,
}

pub struct ReconPipeline<S: Storage, C: ConfigProvider> {
    pub(crate) storage: S,
    pub(crate) config: C,
    pub(crate) sources: Box<dyn SourceProvider>,
}

impl<S: Storage, C: ConfigProvider> ReconPipeline<S, C> {
    pub fn new(storage: S, config: C, sources: Box<dyn SourceProvider>) -> Self {
        Self {
            storage,
            config,
            sources,
        }
    }

    fn output_file(&self, name: &str, date: &str) -> String {
        let name = name.replace("{date}", date);
        Path::new(self.config.output_path())
            .join(name)
            .to_string_lossy()
            .to_string()
    }

    async fn load_template(&self, path: &str) -> Result<Template> {
        let bytes = self.storage.read_file(path).await.map_err(|e| match e {
            EtlError::IoError(io) if io.kind() == ErrorKind::NotFound => EtlError::SourceNotFound {
                path: path.to_string(),
            },
            other => other,
        })?;
        Ok(Template::new(read_table(path, bytes)?))
    }

    async fn render_stock(
        &self,
        report: &MergedReport,
        protected: &ProtectedArticles,
        target: &TemplateTarget,
        output: String,
    ) -> Result<Rendered> {
        let template = self.load_template(&target.template).await?;
        let projection = project_stock(
            report,
            protected,
            &template,
            target.layout,
            self.config.reset_scope(),
        );
        let document = template.document.with_active_table(projection.table);
        let bytes = write_table(TableFormat::for_output(&output)?, &document)?;

        Ok(Rendered {
            path: output,
            bytes,
            summary: projection.summary,
        })
    }

    async fn render_price(
        &self,
        report: &MergedReport,
        target: &TemplateTarget,
        output: String,
    ) -> Result<Rendered> {
        let template = self.load_template(&target.template).await?;
        let projection = project_price(report, &template, target.layout);
        let document = template.document.with_active_table(projection.table);
        let bytes = write_table(TableFormat::for_output(&output)?, &document)?;

        Ok(Rendered {
            path: output,
            bytes,
            summary: projection.summary,
        })
    }

    async fn discard(&self, paths: &[String]) {
        for path in paths {
            if let Err(e) = self.storage.remove_file(path).await {
                tracing::warn!("Could not remove {}: {}", path, e);
            }
        }
    }

    async fn restore(&self, backups: &[(String, String)]) {
        for (backup, path) in backups {
            if let Err(e) = self.storage.rename_file(backup, path).await {
                tracing::error!("Could not restore {} from {}: {}", path, backup, e);
            }
        }
    }

    /// 先全部寫成 .partial，既有輸出改名為 .bak，再逐一改名到位。
    /// 任何一步失敗就刪掉新檔並還原 .bak，輸出要嘛全部更新，要嘛維持原狀
    async fn commit(&self, outputs: &[(&str, &[u8])]) -> Result<()> {
        let mut staged: Vec<String> = Vec::new();

        for (path, bytes) in outputs {
            let partial = format!("{}{}", path, PARTIAL_SUFFIX);
            let written = self.storage.write_file(&partial, bytes).await;
            staged.push(partial);
            if let Err(e) = written {
                self.discard(&staged).await;
                return Err(e);
            }
        }

        // (backup, original)
        let mut backups: Vec<(String, String)> = Vec::new();
        for (path, _) in outputs {
            let backup = format!("{}{}", path, BACKUP_SUFFIX);
            match self.storage.rename_file(path, &backup).await {
                Ok(()) => backups.push((backup, path.to_string())),
                Err(EtlError::IoError(e)) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    self.restore(&backups).await;
                    self.discard(&staged).await;
                    return Err(e);
                }
            }
        }

        for (idx, (path, _)) in outputs.iter().enumerate() {
            if let Err(e) = self.storage.rename_file(&staged[idx], path).await {
                tracing::error!("Could not move {} into place, rolling back: {}", path, e);
                let placed: Vec<String> = outputs[..idx].iter().map(|(p, _)| p.to_string()).collect();
                self.discard(&placed).await;
                self.discard(&staged[idx..]).await;
                self.restore(&backups).await;
                return Err(e);
            }
        }

        let stale: Vec<String> = backups.into_iter().map(|(backup, _)| backup).collect();
        self.discard(&stale).await;

        for (path, _) in outputs {
            tracing::info!("[+] File {} updated", path);
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for ReconPipeline<S, C> {
    type Summary = RunSummary;

    async fn extract(&self) -> Result<SourceDatasets> {
        let files = self.sources.source_files().await?;
        tracing::debug!("Source provider delivered {:?}", files);

        if files.len() < 2 {
            return Err(EtlError::MissingSources { found: files.len() });
        }
        if files.len() > 2 {
            tracing::warn!(
                "{} source files delivered, only {} and {} are used",
                files.len(),
                files[0].display(),
                files[1].display()
            );
        }

        let first = load_dataset(&self.storage, &files[0]).await?;
        let second = load_dataset(&self.storage, &files[1]).await?;

        Ok(SourceDatasets { first, second })
    }

    async fn transform(&self, data: SourceDatasets) -> Result<MergedReport> {
        let reconciler = Reconciler::new(self.config.merge_key(), self.config.pricing());
        tracing::debug!(
            "Merging {} ({}) with {} ({}) by {:?}",
            data.first.label,
            data.first.len(),
            data.second.label,
            data.second.len(),
            self.config.merge_key()
        );
        reconciler.reconcile(&data.first.items, &data.second.items)
    }

    async fn load(&self, report: MergedReport) -> Result<RunSummary> {
        let protected =
            ProtectedArticles::load(&self.storage, self.config.protected_articles_path()).await?;

        let date = chrono::Local::now().format("%Y%m%d").to_string();
        let stock_target = self.config.stock_target();
        let price_target = self.config.price_target();
        let stock_output = self.output_file(&stock_target.output, &date);
        let price_output = self.output_file(&price_target.output, &date);

        // 兩份範本互不相依，同時處理
        let (stock, price) = tokio::try_join!(
            self.render_stock(&report, &protected, &stock_target, stock_output),
            self.render_price(&report, &price_target, price_output),
        )?;

        let report_json = match self.config.report_json() {
            Some(name) => {
                let records: Vec<_> = report.values().collect();
                Some((
                    self.output_file(&name, &date),
                    serde_json::to_vec_pretty(&records)?,
                ))
            }
            None => None,
        };

        let mut outputs: Vec<(&str, &[u8])> = vec![
            (stock.path.as_str(), stock.bytes.as_slice()),
            (price.path.as_str(), price.bytes.as_slice()),
        ];
        if let Some((path, bytes)) = &report_json {
            outputs.push((path.as_str(), bytes.as_slice()));
        }
        self.commit(&outputs).await?;

        Ok(RunSummary {
            articles: report.len(),
            stock_output: stock.path,
            price_output: price.path,
            report_json: report_json.map(|(path, _)| path),
            stock: stock.summary,
            price: price.summary,
        })
    }
}
