//! Source video download over HTTP.

use futures::StreamExt;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::error::{MediaError, MediaResult};

/// Download a source file to a local path, streaming to disk.
///
/// Returns the number of bytes written. The destination directory must
/// already exist; an empty body is treated as a failure since FFmpeg would
/// reject the file anyway.
pub async fn download_to_file(url: &str, dest: impl AsRef<Path>) -> MediaResult<u64> {
    let dest = dest.as_ref();

    let response = reqwest::get(url)
        .await
        .map_err(|e| MediaError::download_failed(format!("request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(MediaError::download_failed(format!(
            "server returned {status} for {url}"
        )));
    }

    let mut file = tokio::fs::File::create(dest).await?;
    let mut stream = response.bytes_stream();
    let mut written: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| MediaError::download_failed(format!("stream error: {e}")))?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;

    if written == 0 {
        return Err(MediaError::download_failed("response body was empty"));
    }

    info!(bytes = written, dest = %dest.display(), "download complete");
    Ok(written)
}
