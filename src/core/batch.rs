use crate::domain::model::{OutputLayout, ZipDealers, ZIP_COLUMN, ZIP_CSV_HEADER};
use crate::domain::ports::Storage;
use crate::utils::error::{HarvestError, Result};
use std::sync::Arc;

/// In-memory batch of finished ZIP results, flushed once `capacity` is reached.
#[derive(Debug)]
pub struct BatchBuffer {
    capacity: usize,
    pending: Vec<ZipDealers>,
}

impl BatchBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            pending: Vec::with_capacity(capacity),
        }
    }

    /// 加入一筆結果；達到門檻時回傳整批待寫入的資料
    pub fn push(&mut self, item: ZipDealers) -> Option<Vec<ZipDealers>> {
        self.pending.push(item);
        if self.pending.len() >= self.capacity {
            Some(self.drain())
        } else {
            None
        }
    }

    pub fn drain(&mut self) -> Vec<ZipDealers> {
        std::mem::take(&mut self.pending)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// A batch write that stopped partway. ZIP codes in `written` are on disk.
#[derive(Debug)]
pub struct FlushFailure {
    pub written: Vec<String>,
    pub error: HarvestError,
}

/// Writes drained batches to CSV according to the output layout.
pub struct BatchWriter<S: Storage> {
    storage: Arc<S>,
    root: String,
    layout: OutputLayout,
    include_zip_column: bool,
}

impl<S: Storage> BatchWriter<S> {
    pub fn new(storage: Arc<S>, root: &str, layout: OutputLayout, include_zip_column: bool) -> Self {
        Self {
            storage,
            root: root.to_string(),
            layout,
            // 整州合併檔必須帶 Zip 欄才能續跑
            include_zip_column: include_zip_column || layout == OutputLayout::PerState,
        }
    }

    pub fn layout(&self) -> OutputLayout {
        self.layout
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    fn header(&self) -> Vec<&'static str> {
        let mut header = Vec::with_capacity(4);
        if self.include_zip_column {
            header.push(ZIP_COLUMN);
        }
        header.extend(ZIP_CSV_HEADER);
        header
    }

    fn render(&self, items: &[ZipDealers], with_header: bool) -> Result<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        if with_header {
            writer.write_record(self.header())?;
        }

        for item in items {
            for dealer in &item.dealers {
                let fields = dealer.to_csv_fields();
                if self.include_zip_column {
                    writer.write_record(
                        std::iter::once(item.zip.as_str()).chain(fields.iter().map(String::as_str)),
                    )?;
                } else {
                    writer.write_record(&fields)?;
                }
            }
        }

        writer
            .into_inner()
            .map_err(|e| HarvestError::IoError(e.into_error()))
    }

    async fn write_zip_file(&self, path: &str, item: &ZipDealers) -> Result<()> {
        let data = self.render(std::slice::from_ref(item), true)?;
        self.storage.write_file(path, &data).await
    }

    async fn append_state_file(&self, path: &str, batch: &[ZipDealers]) -> Result<()> {
        // 空檔（例如中斷時留下的）也要補表頭
        let is_new = self.storage.file_len(path).await.unwrap_or(0) == 0;
        let data = self.render(batch, is_new)?;
        self.storage.append_file(path, &data).await
    }

    /// Flushes one batch and returns the paths that were written.
    ///
    /// Per-ZIP files are written in batch order and the first failure stops
    /// the batch; a per-state append is all or nothing.
    pub async fn flush(
        &self,
        state: &str,
        batch: Vec<ZipDealers>,
    ) -> std::result::Result<Vec<String>, FlushFailure> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        match self.layout {
            OutputLayout::PerZip => {
                let mut written = Vec::with_capacity(batch.len());
                let mut written_zips = Vec::with_capacity(batch.len());
                for item in &batch {
                    let path = self.layout.output_file(&self.root, state, &item.zip);
                    if let Err(error) = self.write_zip_file(&path, item).await {
                        return Err(FlushFailure {
                            written: written_zips,
                            error,
                        });
                    }
                    tracing::info!("📝 Wrote → {} ({} records)", path, item.dealers.len());
                    written.push(path);
                    written_zips.push(item.zip.clone());
                }
                Ok(written)
            }
            OutputLayout::PerState => {
                let path = self.layout.state_file(&self.root, state);
                self.append_state_file(&path, &batch)
                    .await
                    .map_err(|error| FlushFailure {
                        written: Vec::new(),
                        error,
                    })?;

                let records: usize = batch.iter().map(|item| item.dealers.len()).sum();
                tracing::info!(
                    "📝 Appended {} ZIP codes → {} ({} records)",
                    batch.len(),
                    path,
                    records
                );
                Ok(vec![path])
            }
        }
    }
}
