pub mod toml_config;

pub use toml_config::{HarvestConfig, InputSource};

#[cfg(feature = "cli")]
use crate::domain::model::OutputLayout;
#[cfg(feature = "cli")]
use crate::domain::ports::FetcherKind;
#[cfg(feature = "cli")]
use crate::utils::error::Result;
#[cfg(feature = "cli")]
use crate::utils::validation::{self, Validate};
#[cfg(feature = "cli")]
use clap::{Args, Parser};
#[cfg(feature = "cli")]
use std::path::PathBuf;

pub const DEFAULT_BASE_URL: &str = "https://www.cars.com";
pub const DEFAULT_OUTPUT_ROOT: &str = "USA";
pub const DEFAULT_REPORT_DIR: &str = ".";
/// State-paged crawl writes `<root>/<ST>/`, kept apart from the ZIP-mode tree.
pub const DEFAULT_STATE_OUTPUT_ROOT: &str = ".";
pub const DEFAULT_WORKERS: usize = 8;
pub const MAX_WORKERS: usize = 64;
pub const DEFAULT_RETRIES: u32 = 3;
pub const DEFAULT_BATCH_SIZE: usize = 8;
pub const DEFAULT_PAGE_SIZE: u32 = 200;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_PAGE_WAIT_SECS: u64 = 5;

/// Flags shared by every binary. Unset flags fall back to the TOML file,
/// then to the built-in defaults.
#[cfg(feature = "cli")]
#[derive(Debug, Clone, Default, Args)]
pub struct SharedArgs {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub base_url: Option<String>,

    /// Root directory of the dealer CSV files
    #[arg(long)]
    pub output_root: Option<String>,

    /// Page fetcher: browser (headless Chrome) or http
    #[arg(long)]
    pub fetcher: Option<FetcherKind>,

    /// Chrome or Chromium binary, detected when unset
    #[arg(long)]
    pub chrome_path: Option<PathBuf>,

    /// Fixed user agent, or "random"
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Seconds to wait after navigation before reading the page
    #[arg(long)]
    pub page_wait: Option<u64>,

    /// Show the browser window
    #[arg(long)]
    pub no_headless: bool,

    /// Hide progress bars
    #[arg(long)]
    pub no_progress: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit JSON log lines
    #[arg(long)]
    pub log_json: bool,

    /// Enable system monitoring
    #[arg(long)]
    pub monitor: bool,
}

#[cfg(feature = "cli")]
impl SharedArgs {
    /// 讀取 TOML（若有指定）並套用命令列覆蓋
    pub fn load(&self) -> Result<HarvestConfig> {
        let mut config = match &self.config {
            Some(path) => {
                tracing::info!("📁 Loading configuration from: {}", path.display());
                HarvestConfig::from_file(path)?
            }
            None => HarvestConfig::default(),
        };
        self.apply_to(&mut config);
        Ok(config)
    }

    pub fn apply_to(&self, config: &mut HarvestConfig) {
        if let Some(base_url) = &self.base_url {
            config.source.base_url = base_url.clone();
        }
        if let Some(root) = &self.output_root {
            config.output.root = root.clone();
        }
        if let Some(fetcher) = self.fetcher {
            config.source.fetcher = fetcher;
        }
        if let Some(path) = &self.chrome_path {
            config.source.chrome_path = Some(path.clone());
        }
        if let Some(user_agent) = &self.user_agent {
            config.source.user_agent = user_agent.clone();
        }
        if let Some(timeout) = self.timeout {
            config.source.timeout_seconds = timeout;
        }
        if let Some(wait) = self.page_wait {
            config.source.page_wait_seconds = wait;
        }
        if self.no_headless {
            config.source.headless = false;
        }
        if self.no_progress {
            config.monitoring.progress = false;
        }
        if self.monitor {
            config.monitoring.enabled = true;
        }
        if self.log_json {
            config.monitoring.log_json = true;
        }
    }
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "dealer-harvest")]
#[command(about = "Harvest dealer listings for every ZIP code of a state")]
pub struct CliConfig {
    #[command(flatten)]
    pub shared: SharedArgs,

    /// One state file, e.g. zipcode/AZ.json
    #[arg(long, conflicts_with = "zip_folder")]
    pub zip_file: Option<PathBuf>,

    /// Folder of state files, processed one after another
    #[arg(long)]
    pub zip_folder: Option<PathBuf>,

    /// Directory for the scrape reports
    #[arg(long)]
    pub report_dir: Option<String>,

    /// Output layout: per_zip or per_state
    #[arg(long)]
    pub layout: Option<OutputLayout>,

    /// Prefix every row with the Zip column
    #[arg(long)]
    pub zip_column: bool,

    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Attempts per ZIP code
    #[arg(long)]
    pub retries: Option<u32>,

    /// ZIP results buffered before a write
    #[arg(long)]
    pub batch_size: Option<usize>,

    #[arg(long)]
    pub page_size: Option<u32>,
}

#[cfg(feature = "cli")]
impl CliConfig {
    pub fn verbose(&self) -> bool {
        self.shared.verbose
    }

    /// Builds the effective run configuration.
    pub fn load(&self) -> Result<HarvestConfig> {
        let mut config = self.shared.load()?;
        self.apply_to(&mut config);
        Ok(config)
    }

    pub fn apply_to(&self, config: &mut HarvestConfig) {
        self.shared.apply_to(config);

        if let Some(file) = &self.zip_file {
            config.input.zip_file = Some(file.clone());
            config.input.zip_folder = None;
        }
        if let Some(folder) = &self.zip_folder {
            config.input.zip_folder = Some(folder.clone());
            config.input.zip_file = None;
        }
        if let Some(dir) = &self.report_dir {
            config.output.report_dir = dir.clone();
        }
        if let Some(layout) = self.layout {
            config.output.layout = layout;
        }
        if self.zip_column {
            config.output.zip_column = true;
        }
        if let Some(workers) = self.workers {
            config.scrape.workers = workers;
        }
        if let Some(retries) = self.retries {
            config.scrape.retries = retries;
        }
        if let Some(batch_size) = self.batch_size {
            config.scrape.batch_size = batch_size;
        }
        if let Some(page_size) = self.page_size {
            config.scrape.page_size = page_size;
        }
    }
}

#[cfg(feature = "cli")]
impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        if let Some(base_url) = &self.shared.base_url {
            validation::validate_url("base_url", base_url)?;
        }
        if let Some(workers) = self.workers {
            validation::validate_range("workers", workers, 1, MAX_WORKERS)?;
        }
        if let Some(retries) = self.retries {
            validation::validate_positive_number("retries", retries as usize, 1)?;
        }
        if let Some(batch_size) = self.batch_size {
            validation::validate_positive_number("batch_size", batch_size, 1)?;
        }
        if let Some(file) = &self.zip_file {
            validation::validate_file_extensions(
                "zip_file",
                &[file.to_string_lossy().into_owned()],
                &["json"],
            )?;
        }
        Ok(())
    }
}
