use crate::domain::model::StateZipList;
use crate::utils::error::{HarvestError, Result};
use serde_json::Value;
use std::collections::{HashSet, VecDeque};
use std::path::Path;
use std::sync::Mutex;

fn format_error(path: &Path, message: impl Into<String>) -> HarvestError {
    HarvestError::InputFormatError {
        path: path.display().to_string(),
        message: message.into(),
    }
}

/// 解析單一州的 ZIP 檔：`{ "AZ": ["85001", "85002"] }`
pub fn parse_state_json(path: &Path, content: &str) -> Result<StateZipList> {
    let value: Value =
        serde_json::from_str(content).map_err(|e| format_error(path, format!("malformed JSON: {}", e)))?;

    let object = value
        .as_object()
        .ok_or_else(|| format_error(path, "top level must be an object"))?;

    if object.len() != 1 {
        return Err(format_error(
            path,
            format!(
                "JSON must contain exactly one state abbreviation as key, found {}",
                object.len()
            ),
        ));
    }

    let (state, zips) = object
        .iter()
        .next()
        .ok_or_else(|| format_error(path, "empty object"))?;

    let entries = zips
        .as_array()
        .ok_or_else(|| format_error(path, format!("value of '{}' must be a list", state)))?;

    let mut parsed = Vec::with_capacity(entries.len());
    for entry in entries {
        match (entry, entry.as_u64()) {
            (Value::String(zip), _) => parsed.push(zip.clone()),
            // 數字型 ZIP 會遺失前導 0，補回五位數
            (Value::Number(_), Some(n)) => parsed.push(format!("{:05}", n)),
            (other, _) => {
                return Err(format_error(
                    path,
                    format!("unexpected ZIP entry {}", other),
                ))
            }
        }
    }

    Ok(StateZipList {
        state: state.trim().to_uppercase(),
        zips: parsed,
    })
}

pub fn load_state_file(path: &Path) -> Result<StateZipList> {
    let content = std::fs::read_to_string(path)?;
    parse_state_json(path, &content)
}

/// Loads every `*.json` state file in `dir`, sorted by file name.
/// Files that do not hold exactly one state are skipped with a warning.
pub fn scan_zip_folder(dir: &Path) -> Result<Vec<StateZipList>> {
    if !dir.is_dir() {
        return Err(HarvestError::ConfigError {
            message: format!("ZIP folder not found: {}", dir.display()),
        });
    }

    let mut paths: Vec<_> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file() && path.extension().and_then(|ext| ext.to_str()) == Some("json")
        })
        .collect();
    paths.sort();

    let mut lists = Vec::new();
    for path in paths {
        match load_state_file(&path) {
            Ok(list) => lists.push(list),
            Err(e) => tracing::warn!("⚠️ Skipping {} ({})", path.display(), e),
        }
    }
    Ok(lists)
}

/// Shared FIFO of ZIP codes consumed by the worker pool.
#[derive(Debug, Default)]
pub struct ZipQueue {
    inner: Mutex<VecDeque<String>>,
}

impl ZipQueue {
    /// Builds the queue from raw input, dropping blanks, duplicates and ZIP
    /// codes that already have output. Returns the queue and the skipped ZIPs.
    pub fn build(zips: &[String], processed: &HashSet<String>) -> (Self, Vec<String>) {
        let mut seen = HashSet::new();
        let mut pending = VecDeque::new();
        let mut skipped = Vec::new();

        for zip in zips.iter().map(|z| z.trim()) {
            if zip.is_empty() || !seen.insert(zip.to_string()) {
                continue;
            }
            if processed.contains(zip) {
                skipped.push(zip.to_string());
            } else {
                pending.push_back(zip.to_string());
            }
        }

        (
            Self {
                inner: Mutex::new(pending),
            },
            skipped,
        )
    }

    pub fn pop(&self) -> Option<String> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front()
    }

    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
