use crate::domain::model::{ReportRow, ZipStatus};
use crate::domain::ports::Storage;
use crate::utils::error::{HarvestError, Result};
use chrono::{DateTime, Local};

pub const REPORT_HEADER: [&str; 6] = ["zip", "records", "file", "time_sec", "status", "attempts"];

/// 失敗列的 file 欄位
pub const ERROR_FILE: &str = "ERROR";

pub fn round_secs(secs: f64) -> String {
    format!("{:.2}", secs)
}

pub fn report_file_name(state: &str, timestamp: DateTime<Local>) -> String {
    format!(
        "{}_scrape_report_{}.csv",
        state,
        timestamp.format("%Y%m%d_%H%M%S")
    )
}

/// Report rows in the order ZIP codes finished.
#[derive(Debug, Default)]
pub struct RunReport {
    rows: Vec<ReportRow>,
}

impl RunReport {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            rows: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, row: ReportRow) {
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[ReportRow] {
        &self.rows
    }

    pub fn total_records(&self) -> usize {
        self.rows.iter().map(|row| row.records).sum()
    }

    pub fn succeeded(&self) -> usize {
        self.rows.iter().filter(|row| row.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.rows.len() - self.succeeded()
    }

    /// 寫檔失敗時，把已記成功的 ZIP 改為失敗；筆數歸零，TOTAL 只算寫出的資料
    pub fn mark_failed(&mut self, zips: &[String], reason: &str) {
        for row in self.rows.iter_mut().filter(|row| zips.contains(&row.zip)) {
            row.status = ZipStatus::Failed(reason.to_string());
            row.file = ERROR_FILE.to_string();
            row.records = 0;
        }
    }
}

fn join_dir(dir: &str, file_name: &str) -> String {
    let dir = dir.trim_end_matches('/');
    if dir.is_empty() || dir == "." {
        file_name.to_string()
    } else {
        format!("{}/{}", dir, file_name)
    }
}

/// Renders the per-ZIP rows followed by the `TOTAL` summary row.
pub fn render_report(rows: &[ReportRow], elapsed_secs: f64, output_glob: &str) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(REPORT_HEADER)?;

    for row in rows {
        writer.write_record([
            row.zip.clone(),
            row.records.to_string(),
            row.file.clone(),
            round_secs(row.time_sec),
            row.status.to_string(),
            row.attempts.to_string(),
        ])?;
    }

    let total_records: usize = rows.iter().map(|row| row.records).sum();
    writer.write_record([
        "TOTAL".to_string(),
        total_records.to_string(),
        output_glob.to_string(),
        round_secs(elapsed_secs),
        "completed".to_string(),
        "-".to_string(),
    ])?;

    writer
        .into_inner()
        .map_err(|e| HarvestError::IoError(e.into_error()))
}

/// Writes `<dir>/<ST>_scrape_report_<timestamp>.csv` and returns its path.
pub async fn write_report<S: Storage>(
    storage: &S,
    dir: &str,
    state: &str,
    rows: &[ReportRow],
    elapsed_secs: f64,
    output_glob: &str,
) -> Result<String> {
    let path = join_dir(dir, &report_file_name(state, Local::now()));
    let data = render_report(rows, elapsed_secs, output_glob)?;
    storage.write_file(&path, &data).await?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn row(zip: &str, records: usize, status: ZipStatus, attempts: u32) -> ReportRow {
        ReportRow {
            zip: zip.to_string(),
            records,
            file: if status == ZipStatus::Success {
                format!("USA/AZ/AZ_{}.csv", zip)
            } else {
                ERROR_FILE.to_string()
            },
            time_sec: 5.4321,
            status,
            attempts,
        }
    }

    #[test]
    fn test_report_file_name() {
        let ts = Local.with_ymd_and_hms(2025, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(report_file_name("AZ", ts), "AZ_scrape_report_20250309_070501.csv");
    }

    #[test]
    fn test_join_dir() {
        assert_eq!(join_dir(".", "a.csv"), "a.csv");
        assert_eq!(join_dir("", "a.csv"), "a.csv");
        assert_eq!(join_dir("reports/", "a.csv"), "reports/a.csv");
    }

    #[test]
    fn test_render_report_with_total_row() {
        let rows = vec![
            row("85001", 12, ZipStatus::Success, 1),
            row("85002", 0, ZipStatus::Failed("HTTP 503".to_string()), 3),
        ];
        let content = String::from_utf8(render_report(&rows, 61.005, "USA/AZ/*.csv").unwrap()).unwrap();
        let lines: Vec<&str> = content.lines().collect();

        assert_eq!(lines[0], "zip,records,file,time_sec,status,attempts");
        assert_eq!(lines[1], "85001,12,USA/AZ/AZ_85001.csv,5.43,success,1");
        assert_eq!(lines[2], "85002,0,ERROR,5.43,failed (HTTP 503),3");
        assert!(lines[3].starts_with("TOTAL,12,USA/AZ/*.csv,61."));
        assert!(lines[3].ends_with(",completed,-"));
    }

    #[test]
    fn test_run_report_mark_failed() {
        let mut report = RunReport::default();
        report.push(row("85001", 12, ZipStatus::Success, 1));
        report.push(row("85003", 4, ZipStatus::Success, 2));
        report.push(row("85002", 0, ZipStatus::Failed("timeout".to_string()), 3));
        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.total_records(), 16);

        report.mark_failed(&["85003".to_string()], "write failed: disk full");
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed(), 2);
        assert_eq!(report.total_records(), 12);
        assert_eq!(report.rows()[1].file, ERROR_FILE);
        assert_eq!(
            report.rows()[1].status.to_string(),
            "failed (write failed: disk full)"
        );
    }
}
