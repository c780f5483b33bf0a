use clap::Parser;
use dealer_harvest::config::InputSource;
use dealer_harvest::domain::model::StateRunSummary;
use dealer_harvest::domain::ports::ConfigProvider;
use dealer_harvest::utils::{logger, validation::Validate};
use dealer_harvest::{adapters, CliConfig, HarvestEngine, HarvestError, LocalStorage};

fn exit_with(e: &HarvestError, context: &str) -> ! {
    tracing::error!(
        "❌ {}: {} (Category: {:?}, Severity: {:?})",
        context,
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    // 輸出用戶友好的錯誤信息
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());

    // 根據錯誤嚴重程度決定退出碼
    std::process::exit(e.exit_code().max(1))
}

fn print_summary(summary: &StateRunSummary) {
    println!(
        "✅ {}: {} ok, {} failed, {} skipped, {} records in {:.2}s",
        summary.state,
        summary.succeeded,
        summary.failed,
        summary.skipped,
        summary.records,
        summary.elapsed_secs
    );
    if let Some(report) = &summary.report_file {
        println!("📄 Report saved → {}", report);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CliConfig::parse();

    // 驗證命令列參數
    if let Err(e) = cli.validate() {
        logger::init_cli_logger(cli.verbose());
        exit_with(&e, "Configuration validation failed");
    }

    let config = match cli.load() {
        Ok(config) => config,
        Err(e) => {
            logger::init_cli_logger(cli.verbose());
            exit_with(&e, "Failed to load configuration");
        }
    };

    // 初始化日誌
    logger::init(cli.verbose(), config.monitoring.log_json);
    tracing::info!("🚀 Starting dealer-harvest");
    if cli.verbose() {
        tracing::debug!("Effective config: {:?}", config);
    }

    if let Err(e) = config.validate() {
        exit_with(&e, "Configuration validation failed");
    }

    let input = match config.input_source() {
        Ok(input) => input,
        Err(e) => exit_with(&e, "No ZIP input given"),
    };

    let monitor_enabled = config.monitoring_enabled();
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let fetcher = match adapters::build_fetcher(&config) {
        Ok(fetcher) => fetcher,
        Err(e) => exit_with(&e, "Failed to create page fetcher"),
    };
    tracing::info!(
        "⚙️ {} workers, {} attempts per ZIP, batch of {}, {} fetcher",
        config.worker_count(),
        config.max_retries(),
        config.batch_size(),
        fetcher.name()
    );

    let storage = LocalStorage::new(".".to_string());
    let engine = HarvestEngine::new_with_monitoring(storage, config, fetcher, monitor_enabled);

    let outcome = match &input {
        InputSource::File(path) => engine.run_file(path).await.map(|summary| vec![summary]),
        InputSource::Folder(dir) => engine.run_folder(dir).await,
    };

    match outcome {
        Ok(summaries) => {
            for summary in &summaries {
                print_summary(summary);
            }
            let failed: usize = summaries.iter().map(|s| s.failed).sum();
            tracing::info!("✅ Harvest finished ({} ZIP codes failed)", failed);
            if failed > 0 {
                println!("⚠️ {} ZIP codes failed; re-run to retry them", failed);
            }
        }
        Err(e) => exit_with(&e, "Harvest failed"),
    }

    Ok(())
}
