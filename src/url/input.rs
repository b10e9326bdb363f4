use crate::url::is_valid_url;
use crate::ProbeError;
use std::io::ErrorKind;
use std::path::Path;

/// Reads candidate URLs from a text file, one per line
///
/// Lines are trimmed and blank lines dropped. A missing file is reported as
/// [`ProbeError::InputNotFound`] so the caller can map it to its own exit status.
pub async fn read_candidates(path: &Path) -> Result<Vec<String>, ProbeError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| match source.kind() {
            ErrorKind::NotFound => ProbeError::InputNotFound {
                path: path.to_path_buf(),
            },
            _ => ProbeError::InputRead {
                path: path.to_path_buf(),
                source,
            },
        })?;

    Ok(split_candidates(&content))
}

/// Splits text into trimmed, non-empty lines
///
/// Order and duplicates are preserved.
pub fn split_candidates(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Keeps valid URLs in input order and counts the rejected lines
pub fn partition_candidates(lines: Vec<String>) -> (Vec<String>, usize) {
    let total = lines.len();
    let valid: Vec<String> = lines.into_iter().filter(|l| is_valid_url(l)).collect();
    let invalid = total - valid.len();
    (valid, invalid)
}
