use clap::Parser;
use dealer_harvest::utils::monitor::SystemMonitor;
use dealer_harvest::utils::{logger, validation::Validate};
use dealer_harvest::{adapters, HarvestError, LocalStorage, SharedArgs, StateHarvester};
use std::sync::Arc;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "state_harvest")]
#[command(about = "Crawl the paged dealer listings of each state, with inventory contacts")]
struct Args {
    #[command(flatten)]
    shared: SharedArgs,

    /// Comma separated state abbreviations (default: all 50)
    #[arg(long, value_delimiter = ',')]
    states: Vec<String>,

    #[arg(long)]
    first_page: Option<u32>,

    #[arg(long)]
    last_page: Option<u32>,

    /// States crawled at the same time
    #[arg(long)]
    concurrent_states: Option<usize>,

    /// Inventory pages fetched at the same time per listing page
    #[arg(long)]
    inventory_workers: Option<usize>,

    /// Skip the per-state zip archive
    #[arg(long)]
    no_archive: bool,
}

fn fail(e: &HarvestError, context: &str) -> ! {
    tracing::error!("❌ {}: {}", context, e);
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());
    std::process::exit(e.exit_code().max(1))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match args.shared.load() {
        Ok(config) => config,
        Err(e) => {
            logger::init_cli_logger(args.shared.verbose);
            fail(&e, "Failed to load configuration");
        }
    };

    // 應用命令列覆蓋設定
    {
        let mode = config.state_mode.get_or_insert_with(Default::default);
        if let Some(root) = &args.shared.output_root {
            mode.output_root = root.clone();
        }
        if !args.states.is_empty() {
            mode.states = args.states.clone();
        }
        if let Some(first) = args.first_page {
            mode.first_page = first;
        }
        if let Some(last) = args.last_page {
            mode.last_page = last;
        }
        if let Some(n) = args.concurrent_states {
            mode.concurrent_states = n;
        }
        if let Some(n) = args.inventory_workers {
            mode.inventory_workers = n;
        }
        if args.no_archive {
            mode.archive = false;
        }
    }

    logger::init(args.shared.verbose, config.monitoring.log_json);
    tracing::info!("🚀 Starting state_harvest");

    if let Err(e) = config.validate() {
        fail(&e, "Configuration validation failed");
    }

    let options = config.state_harvest_options();
    tracing::info!(
        "🗺️ {} states, pages {}..={}, {} states at a time",
        options.states.len(),
        options.first_page,
        options.last_page,
        options.concurrent_states
    );

    let fetcher = match adapters::build_fetcher(&config) {
        Ok(fetcher) => fetcher,
        Err(e) => fail(&e, "Failed to create page fetcher"),
    };

    let monitor = SystemMonitor::new(config.monitoring_enabled());
    monitor.log_stats("start");
    let started = Instant::now();

    let harvester = Arc::new(StateHarvester::new(
        LocalStorage::new(".".to_string()),
        fetcher,
        options,
    ));

    match harvester.run().await {
        Ok(summaries) => {
            for summary in &summaries {
                println!(
                    "✅ {}: {} dealers from {} pages ({} failed){}",
                    summary.state,
                    summary.dealers,
                    summary.pages_scraped,
                    summary.pages_failed,
                    summary
                        .archive
                        .as_ref()
                        .map(|path| format!(" → {}", path))
                        .unwrap_or_default()
                );
            }
            let pages: usize = summaries.iter().map(|s| s.pages_scraped as usize).sum();
            monitor.log_throughput("state harvest done", pages, "pages", started.elapsed());
            monitor.log_final_stats();
        }
        Err(e) => fail(&e, "State harvest failed"),
    }

    Ok(())
}
