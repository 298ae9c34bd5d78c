use anyhow::Context;
use clap::Parser;
use warehouse_etl::utils::error::ErrorSeverity;
use warehouse_etl::utils::{logger, validation::Validate};
use warehouse_etl::{CliArgs, EtlEngine, EtlError, LocalStorage, ReconConfig, ReconPipeline};

fn exit_code(e: &EtlError) -> i32 {
    match e.severity() {
        ErrorSeverity::Medium => 2, // 上游檔案未到齊，可重試
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    }
}

fn report_failure(e: &EtlError) -> ! {
    tracing::error!(
        "❌ Run failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());
    std::process::exit(exit_code(e));
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    if args.json_logs {
        logger::init_json_logger(args.verbose);
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("🚀 Starting warehouse-etl");

    let config: ReconConfig = args
        .load_config()
        .context("failed to load configuration")?;
    tracing::debug!("Effective config: {:?}", config);

    if let Err(e) = config.validate() {
        report_failure(&e);
    }

    let monitor_enabled = args.monitor_enabled(&config);
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let sources = config.source_provider();
    let storage = LocalStorage::new(".".to_string());
    let pipeline = ReconPipeline::new(storage, config, sources);
    let engine = EtlEngine::new_with_monitoring(pipeline, monitor_enabled);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - nothing will be written");
        match engine.preview().await {
            Ok(report) => {
                let bounded = report.values().filter(|r| r.stock.is_sentinel()).count();
                println!("📋 Merged report: {} articles ({} with '>N' stock)", report.len(), bounded);
                for record in report.values().take(10) {
                    println!(
                        "  {} | {} | {} | stock {} | price {}",
                        record.article, record.brand, record.name, record.stock, record.price
                    );
                }
            }
            Err(e) => report_failure(&e),
        }
        return Ok(());
    }

    match engine.run().await {
        Ok(summary) => {
            tracing::info!("✅ Run completed successfully!");
            println!("✅ {} articles merged", summary.articles);
            println!(
                "📁 {} ({} updated, {} reset, {} not in template)",
                summary.stock_output,
                summary.stock.rows_updated,
                summary.stock.rows_reset,
                summary.stock.unmatched.len()
            );
            println!(
                "📁 {} ({} updated, {} not in template)",
                summary.price_output,
                summary.price.rows_updated,
                summary.price.unmatched.len()
            );
            if let Some(path) = &summary.report_json {
                println!("📁 {}", path);
            }
        }
        Err(e) => report_failure(&e),
    }

    Ok(())
}
