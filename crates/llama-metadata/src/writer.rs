//! Snapshot files on disk
//!
//! `protocols.json` and `chains.json`, 4-space indented. Each file is written
//! next to its final path and renamed over it, so readers see either the old
//! snapshot or the new one.

use std::path::{Path, PathBuf};

use llama_core::MetadataSnapshot;

use crate::error::Result;

pub const PROTOCOLS_FILE: &str = "protocols.json";
pub const CHAINS_FILE: &str = "chains.json";

pub async fn write_snapshot(dir: &Path, snapshot: &MetadataSnapshot) -> Result<()> {
    tokio::fs::create_dir_all(dir).await?;

    write_atomic(&dir.join(PROTOCOLS_FILE), &snapshot.protocols_json()?).await?;
    write_atomic(&dir.join(CHAINS_FILE), &snapshot.chains_json()?).await?;

    tracing::info!(
        dir = %dir.display(),
        protocols = snapshot.protocols.len(),
        chains = snapshot.chains.len(),
        "Snapshot written"
    );
    Ok(())
}

pub async fn read_snapshot(dir: &Path) -> Result<MetadataSnapshot> {
    let protocols = tokio::fs::read(dir.join(PROTOCOLS_FILE)).await?;
    let chains = tokio::fs::read(dir.join(CHAINS_FILE)).await?;
    Ok(MetadataSnapshot::from_json(&protocols, &chains)?)
}

pub(crate) async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = temp_path(path);
    tokio::fs::write(&tmp, bytes).await?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
