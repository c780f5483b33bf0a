use dealer_harvest::domain::ports::PageFetcher;
use dealer_harvest::utils::error::HarvestError;
use dealer_harvest::BrowserFetcher;
use httpmock::prelude::*;
use std::path::PathBuf;
use std::time::Duration;

const DYNAMIC_PAGE: &str = r#"
<html><body>
  <div id="dealers"></div>
  <script>
    setTimeout(function () {
      document.getElementById('dealers').innerHTML =
        '<div class="dealer-card"><h2 class="dealer-heading">Rendered Motors</h2></div>';
    }, 200);
  </script>
</body></html>
"#;

/// Chrome 不在機器上時跳過需要真瀏覽器的測試
fn local_chrome() -> Option<PathBuf> {
    match headless_chrome::browser::default_executable() {
        Ok(path) => Some(path),
        Err(e) => {
            eprintln!("skipping browser test, no Chrome found: {}", e);
            None
        }
    }
}

#[tokio::test]
async fn test_missing_chrome_binary_is_browser_error() {
    let fetcher = BrowserFetcher::new(
        Some(PathBuf::from("/nonexistent/dealer-harvest/chrome")),
        "dealer-harvest-test",
        true,
        Duration::from_secs(5),
        Duration::ZERO,
    );

    let err = fetcher.fetch("http://127.0.0.1:1/").await.unwrap_err();

    match &err {
        HarvestError::BrowserError { message } => assert!(message.starts_with("launch")),
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(err.exit_code(), 2);
}

#[tokio::test]
async fn test_settle_wait_returns_rendered_dom() {
    let Some(chrome) = local_chrome() else {
        return;
    };
    let server = MockServer::start();
    let page = server.mock(|when, then| {
        when.method(GET).path("/dealers/buy/");
        then.status(200)
            .header("content-type", "text/html")
            .body(DYNAMIC_PAGE);
    });

    let fetcher = BrowserFetcher::new(
        Some(chrome),
        "dealer-harvest-test",
        true,
        Duration::from_secs(20),
        Duration::from_secs(1),
    );
    assert_eq!(fetcher.name(), "browser");

    let html = fetcher.fetch(&server.url("/dealers/buy/")).await.unwrap();

    assert!(html.contains("Rendered Motors"));
    page.assert_hits(1);
}

#[tokio::test]
async fn test_each_fetch_uses_fresh_browser() {
    let Some(chrome) = local_chrome() else {
        return;
    };
    let server = MockServer::start();
    let page = server.mock(|when, then| {
        when.method(GET).path("/dealers/buy/");
        then.status(200)
            .header("content-type", "text/html")
            .body("<html><body><p>static</p></body></html>");
    });

    let fetcher = BrowserFetcher::new(
        Some(chrome),
        "dealer-harvest-test",
        true,
        Duration::from_secs(20),
        Duration::ZERO,
    );

    for _ in 0..2 {
        let html = fetcher.fetch(&server.url("/dealers/buy/")).await.unwrap();
        assert!(html.contains("static"));
    }
    page.assert_hits(2);
}
