//! Model file provisioning: verify what is on disk, download what is missing.

use anyhow::Result;
use futures_util::StreamExt;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

const MAX_RETRIES: u32 = 3;
const CHUNK_TIMEOUT: Duration = Duration::from_secs(30);

/// A model file the daemon needs before the capture loop can start.
#[derive(Debug, Clone)]
pub struct ModelFile<'a> {
    pub name: &'a str,
    pub path: &'a Path,
    pub url: Option<&'a str>,
    pub checksum: Option<&'a str>,
}

/// Make sure `model.path` exists and matches its checksum, downloading it
/// when it is missing or corrupt.
pub async fn ensure_model(model: &ModelFile<'_>, download_timeout: Duration) -> Result<PathBuf> {
    let mut mismatch = None;
    if model.path.exists() {
        let Some(expected) = model.checksum else {
            debug!("{} model present at {:?}", model.name, model.path);
            return Ok(model.path.to_path_buf());
        };

        info!("{} model exists, verifying checksum...", model.name);
        let actual = compute_file_checksum(model.path)?;
        if actual.eq_ignore_ascii_case(expected) {
            info!("{} model checksum verified", model.name);
            return Ok(model.path.to_path_buf());
        }
        warn!(
            "{} model checksum mismatch (expected {}, got {})",
            model.name, expected, actual
        );
        mismatch = Some((expected, actual));
    }

    let Some(url) = model.url else {
        match mismatch {
            Some((expected, actual)) => anyhow::bail!(
                "{} model at {:?} failed checksum verification (expected {}, got {}) \
                 and no download URL is configured",
                model.name,
                model.path,
                expected,
                actual
            ),
            None => anyhow::bail!(
                "{} model not found at {:?} and no download URL is configured",
                model.name,
                model.path
            ),
        }
    };

    download_model(model.path, url, model.checksum, download_timeout).await?;
    Ok(model.path.to_path_buf())
}

async fn download_model(
    path: &Path,
    url: &str,
    checksum: Option<&str>,
    download_timeout: Duration,
) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(dir).await?;
    }

    let temp_path = temp_path_for(path);
    if temp_path.exists() {
        warn!("Removing existing temporary file: {:?}", temp_path);
        tokio::fs::remove_file(&temp_path).await?;
    }

    let mut last_error = None;
    for attempt in 1..=MAX_RETRIES {
        info!("Downloading {} (attempt {}/{})", url, attempt, MAX_RETRIES);

        let result = match fetch(&temp_path, url, download_timeout).await {
            Ok(()) => verify_download(&temp_path, checksum),
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                tokio::fs::rename(&temp_path, path).await?;
                info!("Model downloaded to {:?}", path);
                return Ok(());
            }
            Err(e) => {
                error!("Download attempt {} failed: {}", attempt, e);
                last_error = Some(e);

                if temp_path.exists() {
                    if let Err(cleanup_err) = tokio::fs::remove_file(&temp_path).await {
                        warn!("Failed to clean up temporary file: {}", cleanup_err);
                    }
                }

                if attempt < MAX_RETRIES {
                    let delay_ms = 1000 * 2_u64.pow(attempt);
                    info!("Waiting {} ms before retry", delay_ms);
                    sleep(Duration::from_millis(delay_ms)).await;
                }
            }
        }
    }

    Err(last_error.unwrap_or_else(|| {
        anyhow::anyhow!("Failed to download model after {} attempts", MAX_RETRIES)
    }))
}

async fn fetch(temp_path: &Path, url: &str, download_timeout: Duration) -> Result<()> {
    let client = reqwest::Client::builder()
        .timeout(download_timeout)
        .connect_timeout(Duration::from_secs(30))
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| anyhow::anyhow!("GET request failed: {}", e))?;
    if !response.status().is_success() {
        anyhow::bail!("HTTP error: {}", response.status());
    }

    let expected_size = response.content_length();
    let mut stream = response.bytes_stream();
    let mut file = tokio::fs::File::create(temp_path)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create temp file: {}", e))?;
    let mut downloaded = 0u64;

    loop {
        let chunk = match timeout(CHUNK_TIMEOUT, stream.next()).await {
            Ok(Some(Ok(chunk))) => chunk,
            Ok(Some(Err(e))) => anyhow::bail!("Download error: {}", e),
            Ok(None) => break,
            Err(_) => anyhow::bail!(
                "Download stalled: no data within {} seconds",
                CHUNK_TIMEOUT.as_secs()
            ),
        };
        downloaded += chunk.len() as u64;
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    drop(file);

    if let Some(expected) = expected_size {
        if downloaded != expected {
            anyhow::bail!(
                "File size mismatch: expected {}, got {}",
                pretty_bytes(expected),
                pretty_bytes(downloaded)
            );
        }
    }
    info!("Downloaded {}", pretty_bytes(downloaded));
    Ok(())
}

fn verify_download(temp_path: &Path, checksum: Option<&str>) -> Result<()> {
    let Some(expected) = checksum else {
        return Ok(());
    };
    let actual = compute_file_checksum(temp_path)?;
    if !actual.eq_ignore_ascii_case(expected) {
        anyhow::bail!("Checksum mismatch: expected {}, got {}", expected, actual);
    }
    info!("Checksum verification passed: {}", actual);
    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Hex-encoded SHA-256 of a file.
pub fn compute_file_checksum(path: &Path) -> Result<String> {
    use std::io::Read;

    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];
    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

fn pretty_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    format!("{:.2} {}", size, UNITS[unit_index])
}
