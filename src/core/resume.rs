use crate::domain::model::{OutputLayout, ZIP_COLUMN};
use crate::domain::ports::Storage;
use crate::utils::error::Result;
use std::collections::HashSet;

/// ZIP codes of `state` that already have output from an earlier run.
///
/// Per-ZIP layout: every non-empty `<ST>_<zip>.csv` under `<root>/<ST>/`.
/// Per-state layout: the `Zip` column of `<root>/<ST>/<ST>_dealers.csv`.
pub async fn processed_zips<S: Storage>(
    storage: &S,
    root: &str,
    state: &str,
    layout: OutputLayout,
) -> Result<HashSet<String>> {
    match layout {
        OutputLayout::PerZip => processed_from_files(storage, root, state).await,
        OutputLayout::PerState => processed_from_state_file(storage, root, state, layout).await,
    }
}

async fn processed_from_files<S: Storage>(
    storage: &S,
    root: &str,
    state: &str,
) -> Result<HashSet<String>> {
    let prefix = format!("{}_", state);
    let files = storage
        .list_files(&OutputLayout::state_dir(root, state))
        .await?;

    Ok(files
        .into_iter()
        .filter(|file| file.len > 0)
        .filter_map(|file| {
            file.name
                .strip_prefix(&prefix)
                .and_then(|rest| rest.strip_suffix(".csv"))
                .filter(|zip| !zip.is_empty() && *zip != "dealers")
                .map(str::to_string)
        })
        .collect())
}

async fn processed_from_state_file<S: Storage>(
    storage: &S,
    root: &str,
    state: &str,
    layout: OutputLayout,
) -> Result<HashSet<String>> {
    let path = layout.state_file(root, state);
    // 中斷後留下的空檔視同不存在
    if storage.file_len(&path).await.unwrap_or(0) == 0 {
        return Ok(HashSet::new());
    }

    let data = storage.read_file(&path).await?;
    let mut reader = csv::Reader::from_reader(data.as_slice());

    let zip_index = reader
        .headers()?
        .iter()
        .position(|header| header == ZIP_COLUMN);
    let Some(zip_index) = zip_index else {
        tracing::warn!("⚠️ {} has no {} column, resume disabled", path, ZIP_COLUMN);
        return Ok(HashSet::new());
    };

    let mut zips = HashSet::new();
    for record in reader.records() {
        if let Some(zip) = record?.get(zip_index) {
            zips.insert(zip.trim().to_string());
        }
    }
    Ok(zips)
}
