pub mod batch;
pub mod extract;
pub mod harvest;
pub mod pool;
pub mod queue;
pub mod report;
pub mod resume;
pub mod state_harvest;
pub mod zipcodes;

pub use crate::domain::model::{DealerRecord, ReportRow, StateZipList};
pub use crate::domain::ports::{ConfigProvider, PageFetcher, Storage};
pub use crate::utils::error::Result;
