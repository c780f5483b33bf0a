use crate::adapters::http::resolve_user_agent;
use crate::domain::ports::PageFetcher;
use crate::utils::error::{HarvestError, Result};
use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions};
use std::ffi::OsString;
use std::fmt::Display;
use std::path::PathBuf;
use std::time::Duration;

const WINDOW_SIZE: (u32, u32) = (1920, 1080);
// 瀏覽器閒置多久沒事件才斷線，要蓋過導航逾時加上等待時間
const IDLE_GRACE: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
struct BrowserSettings {
    chrome_path: Option<PathBuf>,
    headless: bool,
    user_agent: String,
    timeout: Duration,
    page_wait: Duration,
}

/// Renders dynamic pages in headless Chrome.
///
/// Every `fetch` launches its own browser, waits a fixed settle time after
/// navigation so client-side rendering can finish, reads the DOM and closes
/// the browser again. `headless_chrome` is blocking, so the work runs on the
/// blocking pool.
pub struct BrowserFetcher {
    settings: BrowserSettings,
}

impl BrowserFetcher {
    pub fn new(
        chrome_path: Option<PathBuf>,
        user_agent: &str,
        headless: bool,
        timeout: Duration,
        page_wait: Duration,
    ) -> Self {
        Self {
            settings: BrowserSettings {
                chrome_path,
                headless,
                user_agent: resolve_user_agent(user_agent),
                timeout,
                page_wait,
            },
        }
    }
}

fn browser_error(action: &str, e: impl Display) -> HarvestError {
    HarvestError::BrowserError {
        message: format!("{} failed: {}", action, e),
    }
}

fn chrome_args(user_agent: &str) -> Vec<OsString> {
    vec![
        OsString::from("--disable-gpu"),
        OsString::from("--disable-dev-shm-usage"),
        OsString::from(format!("--user-agent={}", user_agent)),
    ]
}

fn launch_options<'a>(settings: &BrowserSettings, args: &'a [OsString]) -> Result<LaunchOptions<'a>> {
    LaunchOptions::default_builder()
        .headless(settings.headless)
        .sandbox(false)
        .window_size(Some(WINDOW_SIZE))
        .path(settings.chrome_path.clone())
        .args(args.iter().map(OsString::as_os_str).collect())
        .idle_browser_timeout(settings.timeout + settings.page_wait + IDLE_GRACE)
        .build()
        .map_err(|e| browser_error("launch options", e))
}

fn render_page(settings: &BrowserSettings, url: &str) -> Result<String> {
    let args = chrome_args(&settings.user_agent);
    let options = launch_options(settings, &args)?;

    // Browser 在 drop 時會結束 Chrome 行程，錯誤路徑也一樣
    let browser = Browser::new(options).map_err(|e| browser_error("launch", e))?;
    let tab = browser.new_tab().map_err(|e| browser_error("new tab", e))?;
    tab.set_default_timeout(settings.timeout);

    tab.navigate_to(url).map_err(|e| browser_error("navigate", e))?;
    tab.wait_until_navigated()
        .map_err(|e| browser_error("page load", e))?;

    if !settings.page_wait.is_zero() {
        std::thread::sleep(settings.page_wait);
    }

    let html = tab.get_content().map_err(|e| browser_error("page source", e))?;
    if let Err(e) = tab.close(true) {
        tracing::debug!("Tab close for {} failed: {}", url, e);
    }
    Ok(html)
}

#[async_trait]
impl PageFetcher for BrowserFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let settings = self.settings.clone();
        let url = url.to_string();
        tracing::debug!("🌐 Launching browser for {}", url);
        tokio::task::spawn_blocking(move || render_page(&settings, &url)).await?
    }

    fn name(&self) -> &str {
        "browser"
    }
}
