use crate::config::toml_config::ReconConfig;
use crate::domain::model::MergeKey;
use crate::utils::error::Result;
use clap::Parser;
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "recon.toml";

#[derive(Debug, Clone, Parser)]
#[command(name = "warehouse-etl")]
#[command(about = "Merge two warehouse exports into stock and price upload files")]
pub struct CliArgs {
    /// Path to TOML configuration file (defaults to ./recon.toml when present)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Warehouse export; give it twice, the first one has priority
    #[arg(long = "source", value_name = "FILE")]
    pub sources: Vec<String>,

    /// Download folder holding the exports (zip archives are unpacked)
    #[arg(long, value_name = "DIR")]
    pub inbox: Option<String>,

    /// File with the comma separated list of protected articles
    #[arg(long, value_name = "FILE")]
    pub protected: Option<String>,

    /// Directory the output files are written to
    #[arg(long)]
    pub output_path: Option<String>,

    /// Join key: seller_article or canonical_article
    #[arg(long)]
    pub merge_key: Option<MergeKey>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Log as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    /// Log elapsed time and memory per phase
    #[arg(long)]
    pub monitor: bool,

    /// Merge and print a summary without writing any file
    #[arg(long)]
    pub dry_run: bool,
}

impl CliArgs {
    /// 讀取設定檔；未指定時若預設檔不存在則使用內建預設值
    pub fn load_config(&self) -> Result<ReconConfig> {
        let mut config = match &self.config {
            Some(path) => ReconConfig::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                ReconConfig::from_file(DEFAULT_CONFIG_FILE)?
            }
            None => ReconConfig::default(),
        };
        self.apply_to(&mut config);
        Ok(config)
    }

    /// 命令列參數覆蓋設定檔
    pub fn apply_to(&self, config: &mut ReconConfig) {
        if !self.sources.is_empty() {
            config.sources.files = self.sources.clone();
        }
        if let Some(inbox) = &self.inbox {
            config.sources.inbox_dir = inbox.clone();
            if self.sources.is_empty() {
                config.sources.files.clear();
            }
        }
        if let Some(protected) = &self.protected {
            config.protected.path = Some(protected.clone());
        }
        if let Some(output_path) = &self.output_path {
            config.load.output_path = output_path.clone();
        }
        if let Some(merge_key) = self.merge_key {
            config.merge.key = merge_key;
        }
    }

    pub fn monitor_enabled(&self, config: &ReconConfig) -> bool {
        self.monitor || config.monitoring_enabled()
    }
}
