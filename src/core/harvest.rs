use crate::core::batch::{BatchBuffer, BatchWriter};
use crate::core::pool::{self, retry_fixed};
use crate::core::queue::{self, ZipQueue};
use crate::core::report::{self, RunReport, ERROR_FILE};
use crate::core::{extract, resume};
use crate::domain::model::{
    ReportRow, StateRunSummary, StateZipList, ZipDealers, ZipStatus,
};
use crate::domain::ports::{ConfigProvider, PageFetcher, Storage};
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;
use crate::utils::progress;
use indicatif::ProgressBar;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

/// ZIP 搜尋頁網址
pub fn zip_url(base_url: &str, page_size: u32, zip: &str) -> String {
    format!(
        "{}/dealers/buy/?page=1&page_size={}&zip={}",
        base_url.trim_end_matches('/'),
        page_size,
        zip
    )
}

/// Everything guarded by the single run lock.
struct RunState {
    report: RunReport,
    batch: BatchBuffer,
}

struct ZipContext<S: Storage> {
    state: String,
    base_url: String,
    page_size: u32,
    max_retries: u32,
    fetcher: Arc<dyn PageFetcher>,
    writer: BatchWriter<S>,
    shared: Mutex<RunState>,
    progress: ProgressBar,
    queue: Arc<ZipQueue>,
}

impl<S: Storage> ZipContext<S> {
    /// 寫出一批資料；寫檔失敗時只把沒寫成的 ZIP 改成失敗
    async fn flush_batch(&self, shared: &mut RunState, batch: Vec<ZipDealers>) {
        if batch.is_empty() {
            return;
        }
        let zips: Vec<String> = batch.iter().map(|item| item.zip.clone()).collect();

        if let Err(failure) = self.writer.flush(&self.state, batch).await {
            let unwritten: Vec<String> = zips
                .into_iter()
                .filter(|zip| !failure.written.contains(zip))
                .collect();
            tracing::error!(
                "❌ Failed to write {} ZIP codes for {}: {}",
                unwritten.len(),
                self.state,
                failure.error
            );
            shared
                .report
                .mark_failed(&unwritten, &format!("write failed: {}", failure.error));
        }
    }

    async fn process_zip(&self, zip: String) {
        let started = Instant::now();
        let url = zip_url(&self.base_url, self.page_size, &zip);

        let outcome = retry_fixed(self.max_retries, |attempt| {
            let url = &url;
            let zip = &zip;
            async move {
                tracing::debug!("[{}] attempt {} → {}", zip, attempt, url);
                let html = self.fetcher.fetch(url).await?;
                Ok(extract::parse_zip_page(&html))
            }
        })
        .await;

        let elapsed = started.elapsed().as_secs_f64();
        let mut shared = self.shared.lock().await;

        match outcome.result {
            Ok(dealers) => {
                let records = dealers.len();
                shared.report.push(ReportRow {
                    zip: zip.clone(),
                    records,
                    file: self
                        .writer
                        .layout()
                        .output_file(self.writer.root(), &self.state, &zip),
                    time_sec: elapsed,
                    status: ZipStatus::Success,
                    attempts: outcome.attempts,
                });
                self.progress.inc(1);
                tracing::info!(
                    "[{}] ✅ {} records | Time: {:.2}s | Remaining: {}",
                    zip,
                    records,
                    elapsed,
                    self.queue.len()
                );

                if let Some(batch) = shared.batch.push(ZipDealers { zip, dealers }) {
                    self.flush_batch(&mut shared, batch).await;
                }
            }
            Err(e) => {
                tracing::error!("[{}] ❌ Error after {} attempts: {}", zip, outcome.attempts, e);
                shared.report.push(ReportRow {
                    zip,
                    records: 0,
                    file: ERROR_FILE.to_string(),
                    time_sec: elapsed,
                    status: ZipStatus::Failed(e.to_string()),
                    attempts: outcome.attempts,
                });
                self.progress.inc(1);
            }
        }
    }
}

/// Drives one harvest run: resume scan, worker pool, batch flush, report.
pub struct HarvestEngine<S: Storage + 'static, C: ConfigProvider> {
    storage: Arc<S>,
    config: C,
    fetcher: Arc<dyn PageFetcher>,
    monitor: SystemMonitor,
}

impl<S: Storage + 'static, C: ConfigProvider> HarvestEngine<S, C> {
    pub fn new(storage: S, config: C, fetcher: Arc<dyn PageFetcher>) -> Self {
        Self::new_with_monitoring(storage, config, fetcher, false)
    }

    pub fn new_with_monitoring(
        storage: S,
        config: C,
        fetcher: Arc<dyn PageFetcher>,
        monitor_enabled: bool,
    ) -> Self {
        Self {
            storage: Arc::new(storage),
            config,
            fetcher,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    /// Harvests every ZIP of one state that has no output yet.
    pub async fn run_state(&self, list: &StateZipList) -> Result<StateRunSummary> {
        let started = Instant::now();
        let state = list.state.clone();
        let root = self.config.output_root();
        let layout = self.config.layout();

        let processed = resume::processed_zips(&*self.storage, root, &state, layout).await?;
        let (queue, skipped) = ZipQueue::build(&list.zips, &processed);
        for zip in &skipped {
            tracing::info!("[{}] ⏭️ Skipped (already processed)", zip);
        }

        let mut summary = StateRunSummary {
            state: state.clone(),
            queued: queue.len(),
            skipped: skipped.len(),
            ..Default::default()
        };

        if queue.is_empty() {
            tracing::info!("🎉 {} complete! All ZIP codes already processed.", state);
            return Ok(summary);
        }

        tracing::info!(
            "🚀 Starting state: {} ({} ZIPs queued, {} skipped)",
            state,
            summary.queued,
            summary.skipped
        );
        self.monitor.log_stats(&format!("{} start", state));

        let queue = Arc::new(queue);
        let ctx = Arc::new(ZipContext {
            state: state.clone(),
            base_url: self.config.base_url().to_string(),
            page_size: self.config.page_size(),
            max_retries: self.config.max_retries(),
            fetcher: Arc::clone(&self.fetcher),
            writer: BatchWriter::new(
                Arc::clone(&self.storage),
                root,
                layout,
                self.config.include_zip_column(),
            ),
            shared: Mutex::new(RunState {
                report: RunReport::with_capacity(summary.queued),
                batch: BatchBuffer::new(self.config.batch_size()),
            }),
            progress: progress::zip_progress(
                &state,
                summary.queued as u64,
                self.config.show_progress(),
            ),
            queue: Arc::clone(&queue),
        });

        let job_ctx = Arc::clone(&ctx);
        pool::drain_queue(queue, self.config.worker_count(), move |zip| {
            let ctx = Arc::clone(&job_ctx);
            async move { ctx.process_zip(zip).await }
        })
        .await?;

        ctx.progress.finish_and_clear();

        let mut shared = ctx.shared.lock().await;
        let leftovers = shared.batch.drain();
        ctx.flush_batch(&mut shared, leftovers).await;

        let elapsed = started.elapsed().as_secs_f64();
        let report_path = report::write_report(
            &*self.storage,
            self.config.report_dir(),
            &state,
            shared.report.rows(),
            elapsed,
            &layout.output_glob(root, &state),
        )
        .await?;

        summary.succeeded = shared.report.succeeded();
        summary.failed = shared.report.failed();
        summary.records = shared.report.total_records();
        summary.elapsed_secs = elapsed;
        summary.report_file = Some(report_path.clone());

        self.monitor.log_throughput(
            &format!("{} done", state),
            summary.queued,
            "ZIPs",
            started.elapsed(),
        );
        tracing::info!(
            "🎉 {} complete! {} ok, {} failed, {} records. Report saved → {}",
            state,
            summary.succeeded,
            summary.failed,
            summary.records,
            report_path
        );

        Ok(summary)
    }

    /// Harvests the single state described by one JSON file.
    pub async fn run_file(&self, path: &Path) -> Result<StateRunSummary> {
        let list = queue::load_state_file(path)?;
        self.run_state(&list).await
    }

    /// Harvests every state file in `dir`, one state after another.
    pub async fn run_folder(&self, dir: &Path) -> Result<Vec<StateRunSummary>> {
        let lists = queue::scan_zip_folder(dir)?;
        tracing::info!("📂 Found {} state files in {}", lists.len(), dir.display());

        let mut summaries = Vec::with_capacity(lists.len());
        for list in &lists {
            summaries.push(self.run_state(list).await?);
        }

        self.monitor.log_final_stats();
        Ok(summaries)
    }
}
