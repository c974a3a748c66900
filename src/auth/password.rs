use thiserror::Error;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("bcrypt failure: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),

    #[error("password worker failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Hashes on the blocking pool; bcrypt at production cost takes tens of
/// milliseconds.
pub async fn hash_password(password: String, cost: u32) -> Result<String, PasswordError> {
    let hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost)).await??;
    Ok(hash)
}

/// Compares against a stored hash. A missing or unparseable hash never
/// matches.
pub async fn verify_password(password: String, hash: Option<String>) -> Result<bool, PasswordError> {
    let Some(hash) = hash.filter(|h| !h.is_empty()) else {
        return Ok(false);
    };

    let matched = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await?;
    match matched {
        Ok(matched) => Ok(matched),
        Err(bcrypt::BcryptError::InvalidHash(_)) | Err(bcrypt::BcryptError::InvalidPrefix(_)) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hashes_and_verifies() {
        let hash = hash_password("correct horse".to_string(), 4).await.unwrap();

        assert!(verify_password("correct horse".to_string(), Some(hash.clone())).await.unwrap());
        assert!(!verify_password("battery staple".to_string(), Some(hash)).await.unwrap());
    }

    #[tokio::test]
    async fn missing_or_garbage_hash_never_matches() {
        assert!(!verify_password("anything".to_string(), None).await.unwrap());
        assert!(!verify_password("anything".to_string(), Some(String::new())).await.unwrap());
        assert!(!verify_password("anything".to_string(), Some("plain".to_string())).await.unwrap());
    }
}
