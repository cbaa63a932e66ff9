use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

use crate::error::GrabError;

pub async fn calculate_hash(filepath: &Path) -> Result<String> {
    let mut file = File::open(filepath)
        .await
        .with_context(|| format!("Failed to open {} for hashing", filepath.display()))?;
    let mut hasher = Sha256::new();
    let mut buffer = [0; 8192];

    loop {
        let n = file.read(&mut buffer).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Compares the file's SHA-256 against `expected` (hex, any case).
pub async fn verify_hash(filepath: &Path, expected: &str) -> Result<String> {
    let actual = calculate_hash(filepath).await?;
    if !expected.trim().eq_ignore_ascii_case(&actual) {
        return Err(GrabError::ChecksumMismatch {
            expected: expected.trim().to_string(),
            actual,
        }
        .into());
    }
    Ok(actual)
}
