use crate::core::extract;
use crate::core::pool::retry_with_pause;
use crate::domain::model::{InventoryContact, OutputLayout, StateCard, StateListing};
use crate::domain::ports::{PageFetcher, Storage};
use crate::utils::error::{HarvestError, Result};
use crate::utils::progress;
use rand::Rng;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use zip::write::{SimpleFileOptions, ZipWriter};
use zip::CompressionMethod;

#[derive(Debug, Clone)]
pub struct StateHarvestOptions {
    pub base_url: String,
    pub output_root: String,
    pub states: Vec<String>,
    pub first_page: u32,
    pub last_page: u32,
    pub concurrent_states: usize,
    pub inventory_workers: usize,
    pub inventory_retries: u32,
    pub inventory_pause: Duration,
    /// Random pause between listing pages, in milliseconds.
    pub page_delay_ms: (u64, u64),
    /// Pause after a listing page fails.
    pub failure_pause: Duration,
    /// Delay between starting two states.
    pub state_stagger: Duration,
    pub archive: bool,
    pub show_progress: bool,
}

impl Default for StateHarvestOptions {
    fn default() -> Self {
        Self {
            base_url: crate::config::DEFAULT_BASE_URL.to_string(),
            output_root: crate::config::DEFAULT_STATE_OUTPUT_ROOT.to_string(),
            states: crate::core::zipcodes::state_abbreviations()
                .into_iter()
                .map(str::to_string)
                .collect(),
            first_page: 1,
            last_page: 10,
            concurrent_states: 8,
            inventory_workers: 4,
            inventory_retries: 3,
            inventory_pause: Duration::from_secs(1),
            page_delay_ms: (1000, 3000),
            failure_pause: Duration::from_secs(3),
            state_stagger: Duration::from_millis(200),
            archive: true,
            show_progress: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StateHarvestSummary {
    pub state: String,
    pub pages_scraped: u32,
    pub pages_failed: u32,
    pub dealers: usize,
    pub files: Vec<String>,
    pub archive: Option<String>,
}

pub fn state_page_url(base_url: &str, page: u32, state: &str) -> String {
    format!(
        "{}/dealers/buy/?page={}&state={}",
        base_url.trim_end_matches('/'),
        page,
        state
    )
}

fn inventory_url(base_url: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else {
        format!("{}{}", base_url.trim_end_matches('/'), href)
    }
}

fn random_pause((min, max): (u64, u64)) -> Duration {
    let (low, high) = if min <= max { (min, max) } else { (max, min) };
    if high == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::thread_rng().gen_range(low..=high))
}

async fn fetch_inventory(
    fetcher: &dyn PageFetcher,
    url: &str,
    retries: u32,
    pause: Duration,
) -> Option<InventoryContact> {
    let outcome = retry_with_pause(retries, pause, |_| async move {
        let html = fetcher.fetch(url).await?;
        Ok(extract::parse_inventory_page(&html))
    })
    .await;

    match outcome.result {
        Ok(contact) => Some(contact),
        Err(e) => {
            tracing::error!(
                "Failed to scrape inventory page {} after {} attempts: {}",
                url,
                outcome.attempts,
                e
            );
            None
        }
    }
}

/// Crawls the paged state listings, enriching each card from its inventory page.
pub struct StateHarvester<S: Storage + 'static> {
    storage: Arc<S>,
    fetcher: Arc<dyn PageFetcher>,
    options: StateHarvestOptions,
}

impl<S: Storage + 'static> StateHarvester<S> {
    pub fn new(storage: S, fetcher: Arc<dyn PageFetcher>, options: StateHarvestOptions) -> Self {
        Self {
            storage: Arc::new(storage),
            fetcher,
            options,
        }
    }

    /// 以有限並行度跑完所有州，回傳順序與完成順序相同
    pub async fn run(self: Arc<Self>) -> Result<Vec<StateHarvestSummary>> {
        let semaphore = Arc::new(Semaphore::new(self.options.concurrent_states.max(1)));
        let mut tasks = JoinSet::new();

        for state in self.options.states.clone() {
            let harvester = Arc::clone(&self);
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| HarvestError::ProcessingError {
                        message: format!("state semaphore closed: {}", e),
                    })?;
                harvester.harvest_state(&state).await
            });

            if !self.options.state_stagger.is_zero() {
                tokio::time::sleep(self.options.state_stagger).await;
            }
        }

        let mut summaries = Vec::with_capacity(self.options.states.len());
        while let Some(joined) = tasks.join_next().await {
            match joined? {
                Ok(summary) => {
                    tracing::info!(
                        "Completed scraping for state {} with {} dealers",
                        summary.state,
                        summary.dealers
                    );
                    summaries.push(summary);
                }
                Err(e) => tracing::error!("Error processing state: {}", e),
            }
        }

        tracing::info!("Scraping completed for all states");
        Ok(summaries)
    }

    pub async fn harvest_state(&self, state: &str) -> Result<StateHarvestSummary> {
        let opts = &self.options;
        let mut summary = StateHarvestSummary {
            state: state.to_string(),
            ..Default::default()
        };
        let page_count = opts.last_page.saturating_sub(opts.first_page) + 1;
        let progress = progress::page_progress(state, page_count as u64, opts.show_progress);
        let mut record_count = 0usize;

        for page in opts.first_page..=opts.last_page {
            let url = state_page_url(&opts.base_url, page, state);
            tracing::info!("Scraping: {}", url);

            let html = match self.fetcher.fetch(&url).await {
                Ok(html) => html,
                Err(e) => {
                    tracing::error!("Page {} for state {} failed: {}", page, state, e);
                    summary.pages_failed += 1;
                    progress.inc(1);
                    if !opts.failure_pause.is_zero() {
                        tokio::time::sleep(opts.failure_pause).await;
                    }
                    continue;
                }
            };

            let cards = extract::parse_state_page(&html);
            tracing::info!("Found {} dealers on page {} for state {}", cards.len(), page, state);
            summary.pages_scraped += 1;

            if cards.is_empty() {
                tracing::warn!("No dealers on page {} for state {}", page, state);
                progress.inc(1);
                continue;
            }

            let listings = self.enrich(state, page, cards).await;
            if !listings.is_empty() {
                let start = record_count + 1;
                record_count += listings.len();
                let path = self.save_page(state, &listings, start, record_count).await?;
                summary.files.push(path);
            }

            let pause = random_pause(opts.page_delay_ms);
            if !pause.is_zero() {
                tokio::time::sleep(pause).await;
            }
            progress.inc(1);
        }

        progress.finish_and_clear();
        summary.dealers = record_count;

        if opts.archive && !summary.files.is_empty() {
            summary.archive = Some(self.archive_state(state, &summary.files).await?);
        }

        Ok(summary)
    }

    /// Fetches inventory pages for a page of cards, at most
    /// `inventory_workers` at a time, keeping the card order.
    async fn enrich(&self, state: &str, page: u32, cards: Vec<StateCard>) -> Vec<StateListing> {
        let opts = &self.options;
        let semaphore = Arc::new(Semaphore::new(opts.inventory_workers.max(1)));
        let mut tasks = JoinSet::new();

        for (index, card) in cards.into_iter().enumerate() {
            let fetcher = Arc::clone(&self.fetcher);
            let semaphore = Arc::clone(&semaphore);
            let base_url = opts.base_url.clone();
            let state = state.to_string();
            let (retries, pause) = (opts.inventory_retries, opts.inventory_pause);

            tasks.spawn(async move {
                let inventory = card
                    .inventory_href
                    .as_deref()
                    .map(|href| inventory_url(&base_url, href));

                let contact = match &inventory {
                    Some(url) => match semaphore.acquire().await {
                        Ok(_permit) => fetch_inventory(fetcher.as_ref(), url, retries, pause)
                            .await
                            .unwrap_or_default(),
                        Err(_) => InventoryContact::default(),
                    },
                    None => InventoryContact::default(),
                };

                tracing::debug!(
                    "Scraped: {:?}, State: {}, Contact: {:?}, Email: {:?}",
                    card.business_name,
                    state,
                    contact.contact_last_name,
                    contact.email
                );

                let listing = StateListing {
                    business_name: card.business_name,
                    contact_last_name: contact.contact_last_name,
                    phone: (!card.phones.is_empty()).then(|| card.phones.join(", ")),
                    email: contact.email,
                    address: card.address,
                    state,
                    inventory_url: inventory,
                    page,
                };
                (index, listing)
            });
        }

        let mut listings = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(entry) => listings.push(entry),
                Err(e) => tracing::error!(
                    "Error on dealer card, page {}, state {}: {}",
                    page,
                    state,
                    e
                ),
            }
        }
        listings.sort_by_key(|(index, _)| *index);
        listings.into_iter().map(|(_, listing)| listing).collect()
    }

    async fn save_page(
        &self,
        state: &str,
        listings: &[StateListing],
        start: usize,
        end: usize,
    ) -> Result<String> {
        let path = format!(
            "{}/{}-{}to{}.csv",
            OutputLayout::state_dir(&self.options.output_root, state),
            state,
            start,
            end
        );

        let mut writer = csv::Writer::from_writer(Vec::new());
        for listing in listings {
            writer.serialize(listing)?;
        }
        let data = writer
            .into_inner()
            .map_err(|e| HarvestError::IoError(e.into_error()))?;

        self.storage.write_file(&path, &data).await?;
        tracing::info!("Saved {} dealers to {}", listings.len(), path);
        Ok(path)
    }

    /// 把這次寫出的分頁 CSV 打包成 `<root>/<ST>.zip`，同資料夾的其他檔案不收
    pub async fn archive_state(&self, state: &str, files: &[String]) -> Result<String> {
        let root = &self.options.output_root;

        let mut contents = Vec::with_capacity(files.len());
        for path in files {
            let name = path.rsplit('/').next().unwrap_or(path);
            let data = self.storage.read_file(path).await?;
            contents.push((format!("{}/{}", state, name), data));
        }

        let zip_data = {
            let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
            let options =
                SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
            for (name, data) in &contents {
                zip.start_file(name.as_str(), options)?;
                zip.write_all(data)?;
            }
            zip.finish()?.into_inner()
        };

        let path = format!("{}/{}.zip", root.trim_end_matches('/'), state);
        self.storage.write_file(&path, &zip_data).await?;
        tracing::info!("Created zip file {} for state {}", path, state);
        Ok(path)
    }
}
