//! Generates the per-state ZIP input files from coarse USPS prefix ranges.
//!
//! The ranges over-approximate: many generated codes are unassigned, which
//! simply yields empty dealer pages during a harvest.

use crate::utils::error::{HarvestError, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub struct StateRange {
    pub abbr: &'static str,
    pub name: &'static str,
    /// Half-open `[start, end)` numeric ranges.
    pub ranges: &'static [(u32, u32)],
}

pub const USPS_RANGES: &[StateRange] = &[
    StateRange { abbr: "AL", name: "alabama", ranges: &[(35000, 36999)] },
    StateRange { abbr: "AK", name: "alaska", ranges: &[(99500, 99999)] },
    StateRange { abbr: "AZ", name: "arizona", ranges: &[(85000, 86599)] },
    StateRange { abbr: "AR", name: "arkansas", ranges: &[(71600, 72999)] },
    StateRange { abbr: "CA", name: "california", ranges: &[(90000, 96199)] },
    StateRange { abbr: "CO", name: "colorado", ranges: &[(80000, 81699)] },
    StateRange { abbr: "CT", name: "connecticut", ranges: &[(6001, 6389), (6401, 6928)] },
    StateRange { abbr: "DE", name: "delaware", ranges: &[(19700, 19999)] },
    StateRange { abbr: "DC", name: "district-of-columbia", ranges: &[(20001, 20600)] },
    StateRange { abbr: "FL", name: "florida", ranges: &[(32000, 35000)] },
    StateRange { abbr: "GA", name: "georgia", ranges: &[(30000, 32000)] },
    StateRange { abbr: "HI", name: "hawaii", ranges: &[(96800, 96999)] },
    StateRange { abbr: "ID", name: "idaho", ranges: &[(83700, 83999)] },
    StateRange { abbr: "IL", name: "illinois", ranges: &[(60000, 62999)] },
    StateRange { abbr: "IN", name: "indiana", ranges: &[(46000, 47999)] },
    StateRange { abbr: "IA", name: "iowa", ranges: &[(50000, 52999)] },
    StateRange { abbr: "KS", name: "kansas", ranges: &[(66000, 67999)] },
    StateRange { abbr: "KY", name: "kentucky", ranges: &[(40000, 42799)] },
    StateRange { abbr: "LA", name: "louisiana", ranges: &[(70000, 71499)] },
    StateRange { abbr: "ME", name: "maine", ranges: &[(3900, 4999)] },
    StateRange { abbr: "MD", name: "maryland", ranges: &[(20600, 21999)] },
    StateRange { abbr: "MA", name: "massachusetts", ranges: &[(1000, 2800)] },
    StateRange { abbr: "MI", name: "michigan", ranges: &[(48000, 49999)] },
    StateRange { abbr: "MN", name: "minnesota", ranges: &[(55000, 56799)] },
    StateRange { abbr: "MS", name: "mississippi", ranges: &[(38600, 39999)] },
    StateRange { abbr: "MO", name: "missouri", ranges: &[(63000, 65899)] },
    StateRange { abbr: "MT", name: "montana", ranges: &[(59000, 59999)] },
    StateRange { abbr: "NE", name: "nebraska", ranges: &[(68000, 69399)] },
    StateRange { abbr: "NV", name: "nevada", ranges: &[(88900, 89999)] },
    StateRange { abbr: "NH", name: "new-hampshire", ranges: &[(3000, 3900)] },
    StateRange { abbr: "NJ", name: "new-jersey", ranges: &[(7000, 8999)] },
    StateRange { abbr: "NM", name: "new-mexico", ranges: &[(87000, 88499)] },
    StateRange { abbr: "NY", name: "new-york", ranges: &[(10000, 14999)] },
    StateRange { abbr: "NC", name: "north-carolina", ranges: &[(27000, 28999)] },
    StateRange { abbr: "ND", name: "north-dakota", ranges: &[(58000, 58999)] },
    StateRange { abbr: "OH", name: "ohio", ranges: &[(43000, 45999)] },
    StateRange { abbr: "OK", name: "oklahoma", ranges: &[(73000, 74999)] },
    StateRange { abbr: "OR", name: "oregon", ranges: &[(97000, 97999)] },
    StateRange { abbr: "PA", name: "pennsylvania", ranges: &[(15000, 19699)] },
    StateRange { abbr: "RI", name: "rhode-island", ranges: &[(2800, 3000)] },
    StateRange { abbr: "SC", name: "south-carolina", ranges: &[(29000, 29999)] },
    StateRange { abbr: "SD", name: "south-dakota", ranges: &[(57000, 57799)] },
    StateRange { abbr: "TN", name: "tennessee", ranges: &[(37000, 38599)] },
    StateRange { abbr: "TX", name: "texas", ranges: &[(73300, 73400), (75000, 79999)] },
    StateRange { abbr: "UT", name: "utah", ranges: &[(84000, 84799)] },
    StateRange { abbr: "VT", name: "vermont", ranges: &[(5000, 5999)] },
    StateRange { abbr: "VA", name: "virginia", ranges: &[(20100, 20200), (22000, 24699)] },
    StateRange { abbr: "WA", name: "washington", ranges: &[(98000, 99499)] },
    StateRange { abbr: "WV", name: "west-virginia", ranges: &[(24700, 26899)] },
    StateRange { abbr: "WI", name: "wisconsin", ranges: &[(53000, 54999)] },
    StateRange { abbr: "WY", name: "wyoming", ranges: &[(82000, 83100)] },
];

/// The 50 states, in the order the state listing pages are crawled.
pub fn state_abbreviations() -> Vec<&'static str> {
    USPS_RANGES
        .iter()
        .map(|state| state.abbr)
        .filter(|abbr| *abbr != "DC")
        .collect()
}

pub fn find_state(abbr: &str) -> Option<&'static StateRange> {
    USPS_RANGES
        .iter()
        .find(|state| state.abbr.eq_ignore_ascii_case(abbr))
}

/// 展開成五位數 ZIP，排序且不重複
pub fn expand(state: &StateRange) -> Vec<String> {
    let mut zips: Vec<u32> = state
        .ranges
        .iter()
        .flat_map(|&(start, end)| start..end)
        .collect();
    zips.sort_unstable();
    zips.dedup();
    zips.into_iter().map(|zip| format!("{:05}", zip)).collect()
}

pub fn render_state_json(state: &StateRange) -> Result<String> {
    let mut body = BTreeMap::new();
    body.insert(state.abbr, expand(state));
    Ok(serde_json::to_string_pretty(&body)?)
}

/// Writes `<ABBR>.json` for each requested state (all when `states` is empty).
pub fn write_state_files(dir: &Path, states: &[String]) -> Result<Vec<PathBuf>> {
    let selected: Vec<&StateRange> = if states.is_empty() {
        USPS_RANGES.iter().collect()
    } else {
        states
            .iter()
            .map(|abbr| {
                find_state(abbr.trim()).ok_or_else(|| HarvestError::InvalidConfigValueError {
                    field: "states".to_string(),
                    value: abbr.clone(),
                    reason: "Unknown state abbreviation".to_string(),
                })
            })
            .collect::<Result<_>>()?
    };

    std::fs::create_dir_all(dir)?;
    let mut written = Vec::with_capacity(selected.len());
    for state in selected {
        let path = dir.join(format!("{}.json", state.abbr));
        std::fs::write(&path, render_state_json(state)?)?;
        tracing::info!(
            "✅ Saved {} ZIP codes for {} → {}",
            expand(state).len(),
            state.abbr,
            path.display()
        );
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::queue::load_state_file;
    use tempfile::TempDir;

    #[test]
    fn test_fifty_states_without_dc() {
        let states = state_abbreviations();
        assert_eq!(states.len(), 50);
        assert!(!states.contains(&"DC"));
        assert_eq!(USPS_RANGES.len(), 51);
    }

    #[test]
    fn test_expand_pads_and_spans_ranges() {
        let ct = find_state("ct").unwrap();
        let zips = expand(ct);
        assert_eq!(zips.first().map(String::as_str), Some("06001"));
        assert_eq!(zips.last().map(String::as_str), Some("06927"));
        assert!(!zips.contains(&"06389".to_string()));
        assert!(zips.contains(&"06401".to_string()));
    }

    #[test]
    fn test_written_file_round_trips_through_loader() {
        let dir = TempDir::new().unwrap();
        let written = write_state_files(dir.path(), &["AK".to_string()]).unwrap();
        assert_eq!(written.len(), 1);

        let list = load_state_file(&written[0]).unwrap();
        assert_eq!(list.state, "AK");
        assert_eq!(list.zips.len(), 499);
        assert_eq!(list.zips[0], "99500");
    }

    #[test]
    fn test_unknown_state_is_rejected() {
        let dir = TempDir::new().unwrap();
        assert!(write_state_files(dir.path(), &["XX".to_string()]).is_err());
    }
}
