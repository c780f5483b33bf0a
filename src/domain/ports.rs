use crate::domain::model::OutputLayout;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

/// 目錄列舉的結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub name: String,
    pub len: u64,
}

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn append_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    /// Regular files directly under `dir`; a missing directory yields an empty list.
    fn list_files(
        &self,
        dir: &str,
    ) -> impl std::future::Future<Output = Result<Vec<StoredFile>>> + Send;
    /// Size in bytes, `None` when the file does not exist.
    fn file_len(&self, path: &str) -> impl std::future::Future<Output = Option<u64>> + Send;
}

/// Loads a dynamic page and hands back its rendered HTML.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String>;

    fn name(&self) -> &str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetcherKind {
    /// 無頭 Chrome 渲染動態頁面
    #[default]
    #[serde(alias = "chrome", alias = "webdriver")]
    Browser,
    /// 直接 HTTP GET，不執行 JavaScript
    Http,
}

impl std::str::FromStr for FetcherKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "http" => Ok(FetcherKind::Http),
            "browser" | "chrome" | "webdriver" => Ok(FetcherKind::Browser),
            other => Err(format!(
                "unknown fetcher '{}', expected browser or http",
                other
            )),
        }
    }
}

pub trait ConfigProvider: Send + Sync {
    fn base_url(&self) -> &str;
    fn output_root(&self) -> &str;
    fn report_dir(&self) -> &str;
    fn layout(&self) -> OutputLayout;
    fn include_zip_column(&self) -> bool;
    fn worker_count(&self) -> usize;
    fn max_retries(&self) -> u32;
    fn batch_size(&self) -> usize;
    fn page_size(&self) -> u32;
    fn show_progress(&self) -> bool;

    fn fetcher_kind(&self) -> FetcherKind;
    /// Chrome binary; `None` lets the browser crate locate one.
    fn chrome_path(&self) -> Option<&Path>;
    fn user_agent(&self) -> &str;
    fn request_timeout(&self) -> Duration;
    /// Fixed wait after navigation before the page source is read.
    fn page_wait(&self) -> Duration;
    fn headless(&self) -> bool;
}
