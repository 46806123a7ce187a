//! JSON snapshot files

use crate::output::OutputResult;
use crate::store::InstitutionRecord;
use std::fmt::Write as _;
use std::path::Path;

/// Writes records as a pretty-printed, ASCII-only JSON array
///
/// The file is written next to `path` and renamed into place, so readers
/// never observe a half-written snapshot. An empty snapshot is not written.
///
/// # Returns
///
/// * `Ok(n)` - Number of records written (0 when nothing was written)
/// * `Err(OutputError)` - Serialization or filesystem failure
pub fn write_snapshot(path: &Path, records: &[InstitutionRecord]) -> OutputResult<usize> {
    if records.is_empty() {
        tracing::info!("No institutions to save yet; {} not written", path.display());
        return Ok(0);
    }

    let pretty = serde_json::to_string_pretty(records)?;
    let mut contents = escape_non_ascii(&pretty);
    contents.push('\n');

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    std::fs::write(&tmp, contents)?;
    std::fs::rename(&tmp, path)?;

    Ok(records.len())
}

/// Reads a snapshot file written by [`write_snapshot`]
pub fn load_snapshot(path: &Path) -> OutputResult<Vec<InstitutionRecord>> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Replaces every non-ASCII character with a JSON `\uXXXX` escape
///
/// Only valid on serialized JSON, where non-ASCII characters can appear
/// solely inside string literals. Characters outside the Basic
/// Multilingual Plane become surrogate pairs.
pub fn escape_non_ascii(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    let mut units = [0u16; 2];
    for c in json.chars() {
        if c.is_ascii() {
            out.push(c);
            continue;
        }
        for unit in c.encode_utf16(&mut units).iter() {
            let _ = write!(out, "\\u{:04x}", unit);
        }
    }
    out
}
