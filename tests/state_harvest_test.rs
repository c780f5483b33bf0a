use anyhow::Result;
use dealer_harvest::config::toml_config::StateModeConfig;
use dealer_harvest::core::state_harvest::StateHarvestOptions;
use dealer_harvest::{HarvestConfig, HarvestEngine, HttpFetcher, LocalStorage, StateHarvester};
use httpmock::prelude::*;
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const STATE_PAGE: &str = r#"
<html><body>
  <div class="dealer-card-content">
    <h3 class="dealer-heading">Canyon Auto</h3>
    <div class="dealer-address">22 Route 66, Flagstaff, AZ</div>
    <a class="phone-number">(928) 555-0001</a>
    <a class="phone-number">(928) 555-0002</a>
    <a class="inventory-badge-link" href="/dealers/123/inventory/">Inventory</a>
  </div>
  <div class="dealer-card-content">
    <h3 class="dealer-heading">Quiet Cars</h3>
  </div>
</body></html>
"#;

const INVENTORY_PAGE: &str = r#"
<html><body>
  <p>Sales Contact: Maria Lopez</p>
  <p>Write to sales@canyonauto.com for offers</p>
</body></html>
"#;

fn options(server: &MockServer, states: &[&str], last_page: u32) -> StateHarvestOptions {
    StateHarvestOptions {
        base_url: server.base_url(),
        output_root: "out".to_string(),
        states: states.iter().map(|s| s.to_string()).collect(),
        first_page: 1,
        last_page,
        inventory_pause: Duration::ZERO,
        page_delay_ms: (0, 0),
        failure_pause: Duration::ZERO,
        state_stagger: Duration::ZERO,
        show_progress: false,
        ..StateHarvestOptions::default()
    }
}

const ZIP_PAGE: &str = r#"
<html><body>
  <div class="sds-container dealer-card">
    <h2 class="dealer-heading">Phoenix Motors</h2>
    <a class="phone-number">(602) 555-0100</a>
  </div>
</body></html>
"#;

fn quiet(mut options: StateHarvestOptions) -> StateHarvestOptions {
    options.inventory_pause = Duration::ZERO;
    options.page_delay_ms = (0, 0);
    options.failure_pause = Duration::ZERO;
    options.state_stagger = Duration::ZERO;
    options.show_progress = false;
    options
}

fn archive_entries(path: &std::path::Path) -> Vec<String> {
    let zip_data = std::fs::read(path).unwrap();
    let archive = zip::ZipArchive::new(std::io::Cursor::new(zip_data)).unwrap();
    let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
    names.sort();
    names
}

fn harvester(temp_dir: &TempDir, options: StateHarvestOptions) -> Arc<StateHarvester<LocalStorage>> {
    let storage = LocalStorage::new(temp_dir.path().to_str().unwrap().to_string());
    let fetcher = Arc::new(HttpFetcher::new("dealer-harvest-test", Duration::from_secs(5)).unwrap());
    Arc::new(StateHarvester::new(storage, fetcher, options))
}

#[tokio::test]
async fn test_state_pages_are_enriched_and_archived() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let server = MockServer::start();

    let page_one = server.mock(|when, then| {
        when.method(GET)
            .path("/dealers/buy/")
            .query_param("page", "1")
            .query_param("state", "AZ");
        then.status(200).body(STATE_PAGE);
    });
    let page_two = server.mock(|when, then| {
        when.method(GET)
            .path("/dealers/buy/")
            .query_param("page", "2")
            .query_param("state", "AZ");
        then.status(500);
    });
    let inventory = server.mock(|when, then| {
        when.method(GET).path("/dealers/123/inventory/");
        then.status(200).body(INVENTORY_PAGE);
    });

    let summaries = harvester(&temp_dir, options(&server, &["AZ"], 2))
        .run()
        .await?;

    assert_eq!(summaries.len(), 1);
    let summary = &summaries[0];
    assert_eq!(summary.state, "AZ");
    assert_eq!(summary.dealers, 2);
    assert_eq!(summary.pages_scraped, 1);
    assert_eq!(summary.pages_failed, 1);
    assert_eq!(summary.files, vec!["out/AZ/AZ-1to2.csv".to_string()]);
    assert_eq!(summary.archive.as_deref(), Some("out/AZ.zip"));

    page_one.assert();
    page_two.assert();
    inventory.assert();

    let csv_path = temp_dir.path().join("out/AZ/AZ-1to2.csv");
    let mut reader = csv::Reader::from_path(&csv_path)?;
    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    assert_eq!(
        headers,
        vec![
            "Business Name",
            "Contact Last Name",
            "Phone",
            "Email",
            "Address",
            "State",
            "Inventory URL",
            "Page"
        ]
    );

    let rows: Vec<csv::StringRecord> = reader.records().collect::<std::result::Result<_, _>>()?;
    assert_eq!(rows.len(), 2);
    assert_eq!(&rows[0][0], "Canyon Auto");
    assert_eq!(&rows[0][1], "Lopez");
    assert_eq!(&rows[0][2], "(928) 555-0001, (928) 555-0002");
    assert_eq!(&rows[0][3], "sales@canyonauto.com");
    assert_eq!(&rows[0][4], "22 Route 66, Flagstaff, AZ");
    assert_eq!(&rows[0][5], "AZ");
    assert_eq!(rows[0][6], server.url("/dealers/123/inventory/"));
    assert_eq!(&rows[0][7], "1");

    // 沒有庫存連結的卡片保留空欄
    assert_eq!(&rows[1][0], "Quiet Cars");
    assert_eq!(&rows[1][1], "");
    assert_eq!(&rows[1][3], "");
    assert_eq!(&rows[1][6], "");

    let zip_data = std::fs::read(temp_dir.path().join("out/AZ.zip"))?;
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(zip_data))?;
    assert_eq!(archive.len(), 1);
    let mut entry = archive.by_name("AZ/AZ-1to2.csv")?;
    let mut content = String::new();
    entry.read_to_string(&mut content)?;
    assert!(content.contains("sales@canyonauto.com"));

    Ok(())
}

#[tokio::test]
async fn test_inventory_failure_keeps_listing_row() {
    let temp_dir = TempDir::new().unwrap();
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(GET).path("/dealers/buy/").query_param("state", "NV");
        then.status(200).body(STATE_PAGE);
    });
    let inventory = server.mock(|when, then| {
        when.method(GET).path("/dealers/123/inventory/");
        then.status(404);
    });

    let mut opts = options(&server, &["NV"], 1);
    opts.archive = false;
    let summaries = harvester(&temp_dir, opts).run().await.unwrap();

    assert_eq!(summaries[0].dealers, 2);
    assert!(summaries[0].archive.is_none());
    inventory.assert_hits(3);

    let content = std::fs::read_to_string(temp_dir.path().join("out/NV/NV-1to2.csv")).unwrap();
    assert!(content.contains("Canyon Auto"));
    assert!(!temp_dir.path().join("out/NV.zip").exists());
}

#[tokio::test]
async fn test_record_ranges_continue_across_pages() {
    let temp_dir = TempDir::new().unwrap();
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(GET).path("/dealers/buy/").query_param("state", "UT");
        then.status(200).body(STATE_PAGE);
    });
    server.mock(|when, then| {
        when.method(GET).path("/dealers/123/inventory/");
        then.status(200).body(INVENTORY_PAGE);
    });

    let summaries = harvester(&temp_dir, options(&server, &["UT"], 2))
        .run()
        .await
        .unwrap();

    assert_eq!(
        summaries[0].files,
        vec!["out/UT/UT-1to2.csv".to_string(), "out/UT/UT-3to4.csv".to_string()]
    );

    let zip_data = std::fs::read(temp_dir.path().join("out/UT.zip")).unwrap();
    let archive = zip::ZipArchive::new(std::io::Cursor::new(zip_data)).unwrap();
    let mut names: Vec<&str> = archive.file_names().collect();
    names.sort();
    assert_eq!(names, vec!["UT/UT-1to2.csv", "UT/UT-3to4.csv"]);
}

#[tokio::test]
async fn test_states_without_dealers_write_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(GET).path("/dealers/buy/");
        then.status(200).body("<html><body>No dealers</body></html>");
    });

    let summaries = harvester(&temp_dir, options(&server, &["VT", "WY"], 1))
        .run()
        .await
        .unwrap();

    assert_eq!(summaries.len(), 2);
    assert!(summaries.iter().all(|s| s.dealers == 0 && s.files.is_empty()));
    assert!(!temp_dir.path().join("out").exists());
}

#[tokio::test]
async fn test_zip_mode_files_stay_out_of_state_archive() {
    let temp_dir = TempDir::new().unwrap();
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(GET).path("/dealers/buy/").query_param("zip", "85001");
        then.status(200).body(ZIP_PAGE);
    });
    server.mock(|when, then| {
        when.method(GET).path("/dealers/buy/").query_param("state", "AZ");
        then.status(200).body(STATE_PAGE);
    });
    server.mock(|when, then| {
        when.method(GET).path("/dealers/123/inventory/");
        then.status(200).body(INVENTORY_PAGE);
    });

    let mut config = HarvestConfig::default();
    config.source.base_url = server.base_url();
    config.source.timeout_seconds = 5;
    config.monitoring.progress = false;
    config.output.report_dir = "reports".to_string();
    config.state_mode = Some(StateModeConfig {
        states: vec!["AZ".to_string()],
        last_page: 1,
        ..StateModeConfig::default()
    });

    let zip_file = temp_dir.path().join("AZ.json");
    std::fs::write(&zip_file, r#"{"AZ": ["85001"]}"#).unwrap();

    let fetcher = Arc::new(HttpFetcher::new("dealer-harvest-test", Duration::from_secs(5)).unwrap());
    let storage = || LocalStorage::new(temp_dir.path().to_str().unwrap().to_string());

    let zip_summary = HarvestEngine::new(storage(), config.clone(), fetcher.clone())
        .run_file(&zip_file)
        .await
        .unwrap();
    assert_eq!(zip_summary.succeeded, 1);
    assert!(temp_dir.path().join("USA/AZ/AZ_85001.csv").exists());

    // 預設設定下兩種模式各有自己的根目錄
    let options = quiet(config.state_harvest_options());
    assert_ne!(options.output_root, "USA");
    let summaries = Arc::new(StateHarvester::new(storage(), fetcher.clone(), options))
        .run()
        .await
        .unwrap();
    let archive = summaries[0].archive.clone().unwrap();
    assert_eq!(archive_entries(&temp_dir.path().join(&archive)), vec!["AZ/AZ-1to2.csv"]);

    // 即使共用根目錄，壓縮檔也只收這次寫的分頁檔
    let mut shared = quiet(config.state_harvest_options());
    shared.output_root = "USA".to_string();
    let summaries = Arc::new(StateHarvester::new(storage(), fetcher, shared))
        .run()
        .await
        .unwrap();
    assert_eq!(summaries[0].archive.as_deref(), Some("USA/AZ.zip"));
    assert_eq!(
        archive_entries(&temp_dir.path().join("USA/AZ.zip")),
        vec!["AZ/AZ-1to2.csv"]
    );
    assert!(temp_dir.path().join("USA/AZ/AZ_85001.csv").exists());
}
