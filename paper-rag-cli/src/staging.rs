//! Raw upload staging under `UPLOADS_PATH/<topic>/`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use paper_rag::file_store::file_stem;
use tokio::fs;
use tracing::debug;

/// Directory holding the staged uploads of `topic`.
///
/// Named like the topic's index file, so topics the vector store refuses to
/// keep apart never share a directory either.
pub fn topic_dir(uploads: &Path, topic: &str) -> PathBuf {
    uploads.join(file_stem(topic))
}

/// Copy `source` into the topic's upload directory and return its filename and bytes.
///
/// A staged file with the same name is replaced.
pub async fn stage(uploads: &Path, topic: &str, source: &Path) -> Result<(String, Vec<u8>)> {
    let Some(filename) = source.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
        bail!("{} has no usable file name", source.display());
    };

    let bytes = fs::read(source).await.with_context(|| format!("reading {}", source.display()))?;

    let dir = topic_dir(uploads, topic);
    fs::create_dir_all(&dir).await.with_context(|| format!("creating {}", dir.display()))?;
    let target = dir.join(&filename);
    fs::write(&target, &bytes).await.with_context(|| format!("writing {}", target.display()))?;

    debug!(topic, filename = %filename, path = %target.display(), "staged upload");
    Ok((filename, bytes))
}

/// Remove every staged upload of `topic`. Missing directories are fine.
pub async fn remove_topic(uploads: &Path, topic: &str) -> Result<()> {
    let dir = topic_dir(uploads, topic);
    match fs::remove_dir_all(&dir).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("removing {}", dir.display())),
    }
}
