use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

const ZIP_TEMPLATE: &str =
    "{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})";
const PAGE_TEMPLATE: &str = "{msg} [{bar:30.yellow/cyan}] {pos}/{len} pages";

fn styled(total: u64, template: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    // 樣板是常數，解析失敗時退回預設樣式
    if let Ok(style) = ProgressStyle::default_bar().template(template) {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

fn hidden(total: u64) -> ProgressBar {
    ProgressBar::with_draw_target(Some(total), ProgressDrawTarget::hidden())
}

/// ZIP 佇列的進度條；`enabled = false` 時回傳隱藏的進度條
pub fn zip_progress(state: &str, total: u64, enabled: bool) -> ProgressBar {
    if !enabled {
        return hidden(total);
    }
    let pb = styled(total, ZIP_TEMPLATE);
    pb.set_message(format!("Scraping {}", state));
    pb
}

pub fn page_progress(state: &str, total: u64, enabled: bool) -> ProgressBar {
    if !enabled {
        return hidden(total);
    }
    let pb = styled(total, PAGE_TEMPLATE);
    pb.set_message(format!("Scraping {}", state));
    pb
}
