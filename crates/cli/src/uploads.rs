use std::path::{Path, PathBuf};

/// Writes uploaded photo bytes under `dir`, named by content hash.
///
/// The client's file name only contributes a sanitized extension.
pub async fn save_upload(
    dir: &Path,
    original_name: Option<&str>,
    data: &[u8],
) -> std::io::Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let hash = blake3::hash(data).to_hex();
    let path = dir.join(format!("{}.{}", &hash[..32], extension(original_name)));
    tokio::fs::write(&path, data).await?;
    Ok(path)
}

/// A manual date field that was sent empty counts as not sent.
pub fn given_date(raw: Option<&str>) -> Option<&str> {
    raw.filter(|s| !s.is_empty())
}

fn extension(original_name: Option<&str>) -> String {
    original_name
        .and_then(|n| Path::new(n).extension())
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .filter(|e| !e.is_empty() && e.len() <= 5 && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| "jpg".to_string())
}
