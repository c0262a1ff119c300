use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use log::info;
use rand::RngCore;
use std::fs;
use std::path::Path;

const NONCE_LEN: usize = 12;

/// Access tokens at rest, sealed with one AES-256-GCM key kept in its own file.
pub struct TokenVault {
    cipher: Aes256Gcm,
}

impl TokenVault {
    /// Reads the key file, generating it on first use.
    pub fn open(key_path: &Path) -> Result<Self> {
        let cipher = if key_path.exists() {
            let key_bytes = fs::read(key_path)
                .with_context(|| format!("Cannot read key {}", key_path.display()))?;
            Aes256Gcm::new_from_slice(&key_bytes)
                .map_err(|e| anyhow::anyhow!("Failed to create cipher from key: {}", e))?
        } else {
            let mut key_bytes = [0u8; 32];
            rand::thread_rng().fill_bytes(&mut key_bytes);
            fs::write(key_path, key_bytes)
                .with_context(|| format!("Cannot write key {}", key_path.display()))?;
            Aes256Gcm::new_from_slice(&key_bytes)
                .map_err(|e| anyhow::anyhow!("Failed to create cipher from new key: {}", e))?
        };
        Ok(Self { cipher })
    }

    pub fn seal(&self, token: &str) -> Result<String> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, token.as_bytes())
            .map_err(|e| anyhow::anyhow!("Failed to encrypt token: {}", e))?;

        let mut combined = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        combined.extend_from_slice(&nonce_bytes);
        combined.extend_from_slice(&ciphertext);

        Ok(BASE64.encode(&combined))
    }

    pub fn open_sealed(&self, sealed: &str) -> Result<String> {
        let combined = BASE64
            .decode(sealed.trim())
            .map_err(|e| anyhow::anyhow!("Failed to decode base64: {}", e))?;
        if combined.len() < NONCE_LEN {
            anyhow::bail!("Sealed token is too short");
        }

        let (nonce_bytes, ciphertext) = combined.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|e| anyhow::anyhow!("Failed to decrypt token: {}", e))?;

        String::from_utf8(plaintext)
            .map_err(|e| anyhow::anyhow!("Failed to convert decrypted bytes to string: {}", e))
    }

    /// Reads the token stored at `path`, or asks for it once with `prompt` and stores it.
    pub fn load_or_prompt<F>(&self, path: &Path, prompt: F) -> Result<String>
    where
        F: FnOnce() -> Result<String>,
    {
        if path.exists() {
            let sealed = fs::read_to_string(path)
                .with_context(|| format!("Cannot read {}", path.display()))?;
            return self.open_sealed(&sealed);
        }

        let token = prompt()?.trim().to_string();
        fs::write(path, self.seal(&token)?)
            .with_context(|| format!("Cannot write {}", path.display()))?;
        info!("Stored new token in {}", path.display());
        Ok(token)
    }
}

pub fn prompt_token(service: &str) -> Result<String> {
    rpassword::prompt_password(format!("Input {} token: ", service))
        .with_context(|| format!("Cannot read {} token from terminal", service))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_prompt_happens_once_then_token_is_read_back() {
        let dir = TempDir::new().unwrap();
        let vault = TokenVault::open(&dir.path().join(".key")).unwrap();
        let token_path = dir.path().join(".dropbox_token");

        let first = vault
            .load_or_prompt(&token_path, || Ok(" sl.abc \n".to_string()))
            .unwrap();
        let second = vault
            .load_or_prompt(&token_path, || panic!("must not prompt again"))
            .unwrap();

        assert_eq!(first, "sl.abc");
        assert_eq!(second, "sl.abc");
        assert_ne!(fs::read_to_string(&token_path).unwrap(), "sl.abc");
    }

    #[test]
    fn test_key_file_is_reused() {
        let dir = TempDir::new().unwrap();
        let key_path = dir.path().join(".key");

        let sealed = TokenVault::open(&key_path).unwrap().seal("secret").unwrap();
        let reopened = TokenVault::open(&key_path).unwrap();

        assert_eq!(reopened.open_sealed(&sealed).unwrap(), "secret");
    }

    #[test]
    fn test_tampered_token_is_rejected() {
        let dir = TempDir::new().unwrap();
        let vault = TokenVault::open(&dir.path().join(".key")).unwrap();
        let mut combined = BASE64.decode(vault.seal("secret").unwrap()).unwrap();
        let last = combined.len() - 1;
        combined[last] ^= 0x01;

        assert!(vault.open_sealed(&BASE64.encode(&combined)).is_err());
        assert!(vault.open_sealed("AAAA").is_err());
    }
}
