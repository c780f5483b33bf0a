// Adapters layer: concrete implementations for external systems (storage, http, browser).

pub mod browser;
pub mod http;
pub mod storage;

use crate::domain::ports::{ConfigProvider, FetcherKind, PageFetcher};
use crate::utils::error::Result;
use std::path::Path;
use std::sync::Arc;

pub use http::HttpFetcher;
pub use storage::LocalStorage;
pub use browser::BrowserFetcher;

/// 依設定建立頁面抓取器
pub fn build_fetcher<C: ConfigProvider>(config: &C) -> Result<Arc<dyn PageFetcher>> {
    let fetcher: Arc<dyn PageFetcher> = match config.fetcher_kind() {
        FetcherKind::Http => Arc::new(HttpFetcher::new(
            config.user_agent(),
            config.request_timeout(),
        )?),
        FetcherKind::Browser => Arc::new(BrowserFetcher::new(
            config.chrome_path().map(Path::to_path_buf),
            config.user_agent(),
            config.headless(),
            config.request_timeout(),
            config.page_wait(),
        )),
    };
    tracing::debug!("Using {} page fetcher", fetcher.name());
    Ok(fetcher)
}
