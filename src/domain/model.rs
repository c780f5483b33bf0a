use serde::{Deserialize, Serialize};
use std::fmt;

/// 欄位缺值時寫入 CSV 的佔位字串
pub const NOT_AVAILABLE: &str = "N/A";

pub const ZIP_CSV_HEADER: [&str; 3] = ["Business Name", "Phone(s)", "Address"];
pub const ZIP_COLUMN: &str = "Zip";

/// One dealer card scraped from a ZIP search page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DealerRecord {
    pub business_name: Option<String>,
    pub phones: Vec<String>,
    pub address: Option<String>,
}

impl DealerRecord {
    pub fn name_field(&self) -> &str {
        self.business_name.as_deref().unwrap_or(NOT_AVAILABLE)
    }

    pub fn phone_field(&self) -> String {
        if self.phones.is_empty() {
            NOT_AVAILABLE.to_string()
        } else {
            self.phones.join("; ")
        }
    }

    pub fn address_field(&self) -> &str {
        self.address.as_deref().unwrap_or(NOT_AVAILABLE)
    }

    pub fn to_csv_fields(&self) -> [String; 3] {
        [
            self.name_field().to_string(),
            self.phone_field(),
            self.address_field().to_string(),
        ]
    }
}

/// 一個州的輸入檔內容：`{ "AZ": ["85001", ...] }`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateZipList {
    pub state: String,
    pub zips: Vec<String>,
}

/// A successful ZIP result waiting in the batch buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZipDealers {
    pub zip: String,
    pub dealers: Vec<DealerRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OutputLayout {
    /// `<ST>/<ST>_<zip>.csv`
    #[default]
    PerZip,
    /// `<ST>/<ST>_dealers.csv`, always with the Zip column
    PerState,
}

impl std::str::FromStr for OutputLayout {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "per_zip" | "zip" => Ok(OutputLayout::PerZip),
            "per_state" | "state" => Ok(OutputLayout::PerState),
            other => Err(format!(
                "unknown output layout '{}', expected per_zip or per_state",
                other
            )),
        }
    }
}

impl OutputLayout {
    pub fn state_dir(root: &str, state: &str) -> String {
        format!("{}/{}", root.trim_end_matches('/'), state)
    }

    /// 某個 ZIP 的輸出檔路徑（相對於儲存根目錄）
    pub fn output_file(&self, root: &str, state: &str, zip: &str) -> String {
        match self {
            OutputLayout::PerZip => {
                format!("{}/{}_{}.csv", Self::state_dir(root, state), state, zip)
            }
            OutputLayout::PerState => self.state_file(root, state),
        }
    }

    pub fn state_file(&self, root: &str, state: &str) -> String {
        format!("{}/{}_dealers.csv", Self::state_dir(root, state), state)
    }

    pub fn output_glob(&self, root: &str, state: &str) -> String {
        format!("{}/*.csv", Self::state_dir(root, state))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZipStatus {
    Success,
    Failed(String),
}

impl fmt::Display for ZipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZipStatus::Success => write!(f, "success"),
            ZipStatus::Failed(reason) => write!(f, "failed ({})", reason),
        }
    }
}

/// 報表中每個 ZIP 一列
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub zip: String,
    pub records: usize,
    pub file: String,
    pub time_sec: f64,
    pub status: ZipStatus,
    pub attempts: u32,
}

impl ReportRow {
    pub fn is_success(&self) -> bool {
        self.status == ZipStatus::Success
    }
}

/// Outcome of one `run_state` call.
#[derive(Debug, Clone, Default)]
pub struct StateRunSummary {
    pub state: String,
    pub queued: usize,
    pub skipped: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub records: usize,
    pub elapsed_secs: f64,
    pub report_file: Option<String>,
}

/// A dealer card from a state listing page, before inventory enrichment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateCard {
    pub business_name: Option<String>,
    pub address: Option<String>,
    pub phones: Vec<String>,
    pub inventory_href: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InventoryContact {
    pub contact_last_name: Option<String>,
    pub email: Option<String>,
}

/// 州分頁模式輸出的一列
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateListing {
    #[serde(rename = "Business Name")]
    pub business_name: Option<String>,
    #[serde(rename = "Contact Last Name")]
    pub contact_last_name: Option<String>,
    #[serde(rename = "Phone")]
    pub phone: Option<String>,
    #[serde(rename = "Email")]
    pub email: Option<String>,
    #[serde(rename = "Address")]
    pub address: Option<String>,
    #[serde(rename = "State")]
    pub state: String,
    #[serde(rename = "Inventory URL")]
    pub inventory_url: Option<String>,
    #[serde(rename = "Page")]
    pub page: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dealer_fields_fall_back_to_na() {
        let record = DealerRecord {
            business_name: None,
            phones: vec![],
            address: None,
        };
        assert_eq!(record.to_csv_fields(), ["N/A", "N/A", "N/A"]);
    }

    #[test]
    fn test_phones_joined_with_semicolon() {
        let record = DealerRecord {
            business_name: Some("Desert Motors".to_string()),
            phones: vec!["(602) 555-0100".to_string(), "(602) 555-0101".to_string()],
            address: Some("1 Main St, Phoenix, AZ 85001".to_string()),
        };
        assert_eq!(record.phone_field(), "(602) 555-0100; (602) 555-0101");
    }

    #[test]
    fn test_output_paths() {
        assert_eq!(
            OutputLayout::PerZip.output_file("USA", "AZ", "85001"),
            "USA/AZ/AZ_85001.csv"
        );
        assert_eq!(
            OutputLayout::PerState.output_file("USA/", "AZ", "85001"),
            "USA/AZ/AZ_dealers.csv"
        );
        assert_eq!(OutputLayout::PerZip.output_glob("USA", "AZ"), "USA/AZ/*.csv");
    }

    #[test]
    fn test_layout_from_str() {
        assert_eq!("per-state".parse::<OutputLayout>(), Ok(OutputLayout::PerState));
        assert_eq!("zip".parse::<OutputLayout>(), Ok(OutputLayout::PerZip));
        assert!("flat".parse::<OutputLayout>().is_err());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(ZipStatus::Success.to_string(), "success");
        assert_eq!(
            ZipStatus::Failed("timeout".to_string()).to_string(),
            "failed (timeout)"
        );
    }
}
