use crate::config::{
    DEFAULT_BASE_URL, DEFAULT_BATCH_SIZE, DEFAULT_OUTPUT_ROOT, DEFAULT_PAGE_SIZE,
    DEFAULT_PAGE_WAIT_SECS, DEFAULT_REPORT_DIR, DEFAULT_RETRIES, DEFAULT_STATE_OUTPUT_ROOT,
    DEFAULT_TIMEOUT_SECS,
    DEFAULT_WORKERS, MAX_WORKERS,
};
use crate::adapters::http::DEFAULT_USER_AGENT;
use crate::core::state_harvest::StateHarvestOptions;
use crate::domain::model::OutputLayout;
use crate::domain::ports::{ConfigProvider, FetcherKind};
use crate::utils::error::{HarvestError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

static ENV_VAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").unwrap());

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    pub source: SourceConfig,
    pub scrape: ScrapeConfig,
    pub input: InputConfig,
    pub output: OutputConfig,
    pub monitoring: MonitoringConfig,
    pub state_mode: Option<StateModeConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub base_url: String,
    pub fetcher: FetcherKind,
    pub chrome_path: Option<PathBuf>,
    /// 固定字串，或 `random` 從內建清單挑一個
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub page_wait_seconds: u64,
    pub headless: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            fetcher: FetcherKind::default(),
            chrome_path: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_seconds: DEFAULT_TIMEOUT_SECS,
            page_wait_seconds: DEFAULT_PAGE_WAIT_SECS,
            headless: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapeConfig {
    pub workers: usize,
    pub retries: u32,
    pub batch_size: usize,
    pub page_size: u32,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            retries: DEFAULT_RETRIES,
            batch_size: DEFAULT_BATCH_SIZE,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub zip_file: Option<PathBuf>,
    pub zip_folder: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub root: String,
    pub report_dir: String,
    pub layout: OutputLayout,
    pub zip_column: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            root: DEFAULT_OUTPUT_ROOT.to_string(),
            report_dir: DEFAULT_REPORT_DIR.to_string(),
            layout: OutputLayout::default(),
            zip_column: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub progress: bool,
    pub log_json: bool,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            progress: true,
            log_json: false,
        }
    }
}

/// `[state_mode]`：依州分頁抓取
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StateModeConfig {
    /// Empty means every state.
    pub states: Vec<String>,
    /// 與 `output.root` 分開，避免和 ZIP 模式的檔案混在一起
    pub output_root: String,
    pub first_page: u32,
    pub last_page: u32,
    pub concurrent_states: usize,
    pub inventory_workers: usize,
    pub inventory_retries: u32,
    pub page_delay_ms: [u64; 2],
    pub archive: bool,
}

impl Default for StateModeConfig {
    fn default() -> Self {
        let defaults = StateHarvestOptions::default();
        Self {
            states: Vec::new(),
            output_root: DEFAULT_STATE_OUTPUT_ROOT.to_string(),
            first_page: defaults.first_page,
            last_page: defaults.last_page,
            concurrent_states: defaults.concurrent_states,
            inventory_workers: defaults.inventory_workers,
            inventory_retries: defaults.inventory_retries,
            page_delay_ms: [defaults.page_delay_ms.0, defaults.page_delay_ms.1],
            archive: defaults.archive,
        }
    }
}

/// Where the ZIP lists of a run come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    File(PathBuf),
    Folder(PathBuf),
}

impl HarvestConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| HarvestError::ConfigError {
            message: format!(
                "Cannot read config file {}: {}",
                path.as_ref().display(),
                e
            ),
        })?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        // 處理環境變數替換
        let processed = Self::substitute_env_vars(content);

        toml::from_str(&processed).map_err(|e| HarvestError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${CARS_BASE_URL})，找不到的保留原樣
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    /// 單一檔案優先於資料夾
    pub fn input_source(&self) -> Result<InputSource> {
        match (&self.input.zip_file, &self.input.zip_folder) {
            (Some(file), _) => Ok(InputSource::File(file.clone())),
            (None, Some(folder)) => Ok(InputSource::Folder(folder.clone())),
            (None, None) => Err(HarvestError::MissingConfigError {
                field: "input.zip_file or input.zip_folder".to_string(),
            }),
        }
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.enabled
    }

    pub fn state_mode(&self) -> StateModeConfig {
        self.state_mode.clone().unwrap_or_default()
    }

    /// Options for the state-paged crawl, sharing source and output settings.
    pub fn state_harvest_options(&self) -> StateHarvestOptions {
        let mode = self.state_mode();
        let defaults = StateHarvestOptions::default();
        StateHarvestOptions {
            base_url: self.source.base_url.clone(),
            output_root: mode.output_root.clone(),
            states: if mode.states.is_empty() {
                defaults.states.clone()
            } else {
                mode.states.iter().map(|s| s.trim().to_uppercase()).collect()
            },
            first_page: mode.first_page,
            last_page: mode.last_page,
            concurrent_states: mode.concurrent_states,
            inventory_workers: mode.inventory_workers,
            inventory_retries: mode.inventory_retries,
            page_delay_ms: (mode.page_delay_ms[0], mode.page_delay_ms[1]),
            archive: mode.archive,
            show_progress: self.monitoring.progress,
            ..defaults
        }
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_url("source.base_url", &self.source.base_url)?;
        if let Some(path) = &self.source.chrome_path {
            validation::validate_path("source.chrome_path", &path.to_string_lossy())?;
        }
        validation::validate_non_empty_string("source.user_agent", &self.source.user_agent)?;
        validation::validate_positive_number(
            "source.timeout_seconds",
            self.source.timeout_seconds as usize,
            1,
        )?;

        validation::validate_range("scrape.workers", self.scrape.workers, 1, MAX_WORKERS)?;
        validation::validate_positive_number("scrape.retries", self.scrape.retries as usize, 1)?;
        validation::validate_positive_number("scrape.batch_size", self.scrape.batch_size, 1)?;
        validation::validate_positive_number("scrape.page_size", self.scrape.page_size as usize, 1)?;

        validation::validate_path("output.root", &self.output.root)?;
        validation::validate_path("output.report_dir", &self.output.report_dir)?;

        for (field, path) in [
            ("input.zip_file", &self.input.zip_file),
            ("input.zip_folder", &self.input.zip_folder),
        ] {
            if let Some(path) = path {
                validation::validate_path(field, &path.to_string_lossy())?;
            }
        }
        if let Some(file) = &self.input.zip_file {
            validation::validate_file_extensions(
                "input.zip_file",
                &[file.to_string_lossy().into_owned()],
                &["json"],
            )?;
        }

        if let Some(mode) = &self.state_mode {
            for state in &mode.states {
                validation::validate_state_abbr("state_mode.states", &state.trim().to_uppercase())?;
            }
            validation::validate_path("state_mode.output_root", &mode.output_root)?;
            validation::validate_positive_number("state_mode.first_page", mode.first_page as usize, 1)?;
            if mode.last_page < mode.first_page {
                return Err(HarvestError::InvalidConfigValueError {
                    field: "state_mode.last_page".to_string(),
                    value: mode.last_page.to_string(),
                    reason: format!("Must not be smaller than first_page ({})", mode.first_page),
                });
            }
            validation::validate_positive_number(
                "state_mode.concurrent_states",
                mode.concurrent_states,
                1,
            )?;
            validation::validate_positive_number(
                "state_mode.inventory_workers",
                mode.inventory_workers,
                1,
            )?;
        }

        Ok(())
    }
}

impl ConfigProvider for HarvestConfig {
    fn base_url(&self) -> &str {
        &self.source.base_url
    }

    fn output_root(&self) -> &str {
        &self.output.root
    }

    fn report_dir(&self) -> &str {
        &self.output.report_dir
    }

    fn layout(&self) -> OutputLayout {
        self.output.layout
    }

    fn include_zip_column(&self) -> bool {
        self.output.zip_column
    }

    fn worker_count(&self) -> usize {
        self.scrape.workers
    }

    fn max_retries(&self) -> u32 {
        self.scrape.retries
    }

    fn batch_size(&self) -> usize {
        self.scrape.batch_size
    }

    fn page_size(&self) -> u32 {
        self.scrape.page_size
    }

    fn show_progress(&self) -> bool {
        self.monitoring.progress
    }

    fn fetcher_kind(&self) -> FetcherKind {
        self.source.fetcher
    }

    fn chrome_path(&self) -> Option<&Path> {
        self.source.chrome_path.as_deref()
    }

    fn user_agent(&self) -> &str {
        &self.source.user_agent
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.source.timeout_seconds)
    }

    fn page_wait(&self) -> Duration {
        Duration::from_secs(self.source.page_wait_seconds)
    }

    fn headless(&self) -> bool {
        self.source.headless
    }
}

impl Validate for HarvestConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = HarvestConfig::from_toml_str("").unwrap();

        assert_eq!(config.base_url(), DEFAULT_BASE_URL);
        assert_eq!(config.output_root(), "USA");
        assert_eq!(config.state_harvest_options().output_root, ".");
        assert_eq!(config.worker_count(), DEFAULT_WORKERS);
        assert_eq!(config.max_retries(), 3);
        assert_eq!(config.layout(), OutputLayout::PerZip);
        assert_eq!(config.fetcher_kind(), FetcherKind::Browser);
        assert!(config.chrome_path().is_none());
        assert!(config.headless());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_toml_config() {
        let toml_content = r#"
[source]
base_url = "https://dealers.example.com"
fetcher = "chrome"
chrome_path = "/usr/bin/chromium"
timeout_seconds = 45
page_wait_seconds = 2
headless = false

[scrape]
workers = 10
retries = 5
batch_size = 4
page_size = 100

[input]
zip_folder = "zipcode"

[output]
root = "out"
report_dir = "reports"
layout = "per_state"

[state_mode]
states = ["az", "NV"]
output_root = "state_pages"
last_page = 3
"#;

        let config = HarvestConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.base_url(), "https://dealers.example.com");
        assert_eq!(config.fetcher_kind(), FetcherKind::Browser);
        assert_eq!(config.chrome_path(), Some(Path::new("/usr/bin/chromium")));
        assert_eq!(config.request_timeout(), Duration::from_secs(45));
        assert_eq!(config.page_wait(), Duration::from_secs(2));
        assert!(!config.headless());
        assert_eq!(config.worker_count(), 10);
        assert_eq!(config.batch_size(), 4);
        assert_eq!(config.page_size(), 100);
        assert_eq!(config.layout(), OutputLayout::PerState);
        assert_eq!(config.input.zip_folder, Some(PathBuf::from("zipcode")));
        assert!(config.validate().is_ok());

        let options = config.state_harvest_options();
        assert_eq!(options.states, vec!["AZ".to_string(), "NV".to_string()]);
        assert_eq!(options.first_page, 1);
        assert_eq!(options.last_page, 3);
        assert_eq!(options.output_root, "state_pages");
        assert_eq!(options.base_url, "https://dealers.example.com");
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("DEALER_HARVEST_TEST_BASE_URL", "https://mirror.example.com");

        let toml_content = r#"
[source]
base_url = "${DEALER_HARVEST_TEST_BASE_URL}"
user_agent = "${DEALER_HARVEST_UNSET_VAR}"
"#;

        let config = HarvestConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.source.base_url, "https://mirror.example.com");
        assert_eq!(config.source.user_agent, "${DEALER_HARVEST_UNSET_VAR}");

        std::env::remove_var("DEALER_HARVEST_TEST_BASE_URL");
    }

    #[test]
    fn test_config_validation() {
        let config = HarvestConfig::from_toml_str("[scrape]\nworkers = 0\n").unwrap();
        assert!(config.validate().is_err());

        let config = HarvestConfig::from_toml_str("[source]\nbase_url = \"invalid-url\"\n").unwrap();
        assert!(config.validate().is_err());

        let config =
            HarvestConfig::from_toml_str("[state_mode]\nfirst_page = 5\nlast_page = 2\n").unwrap();
        assert!(config.validate().is_err());

        let config = HarvestConfig::from_toml_str("[input]\nzip_file = \"AZ.txt\"\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_input_source() {
        let config = HarvestConfig::default();
        assert!(matches!(
            config.input_source(),
            Err(HarvestError::MissingConfigError { .. })
        ));

        let config = HarvestConfig::from_toml_str(
            "[input]\nzip_file = \"zipcode/AZ.json\"\nzip_folder = \"zipcode\"\n",
        )
        .unwrap();
        assert_eq!(
            config.input_source().unwrap(),
            InputSource::File(PathBuf::from("zipcode/AZ.json"))
        );
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = HarvestConfig::from_toml_str("[scrape\nworkers = ").unwrap_err();
        assert!(matches!(err, HarvestError::ConfigValidationError { .. }));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[output]\nroot = \"file-test\"\n")
            .unwrap();

        let config = HarvestConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.output_root(), "file-test");
    }
}
