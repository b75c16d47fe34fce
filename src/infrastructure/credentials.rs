//! 加密的 API 密钥文件
//!
//! 文件内容为 base64(nonce || AES-256-GCM 密文)，密钥取自 `MASTER_KEY` 的 SHA-256。
//! 文件不存在或解密失败时返回空密钥，不会中断程序。

use std::fs;
use std::path::Path;

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use anyhow::{anyhow, Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::models::catalog::Provider;

const NONCE_LEN: usize = 12;
const DEFAULT_MASTER_KEY: &str = "default_key";

/// 各模型提供方的 API 密钥
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKeys {
    pub openai: Option<String>,
    pub anthropic: Option<String>,
    pub google: Option<String>,
}

impl ApiKeys {
    /// 读取密钥文件，任何失败都退化为空密钥
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            warn!("⚠️ 密钥文件不存在: {}，使用空密钥", path.display());
            return Self::default();
        }
        match Self::decrypt_file(path, &master_secret()) {
            Ok(keys) => keys,
            Err(e) => {
                warn!("⚠️ 无法解密密钥文件 {}: {}，使用空密钥", path.display(), e);
                Self::default()
            }
        }
    }

    /// 加密保存密钥文件
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        self.save_with_secret(path.as_ref(), &master_secret())
    }

    /// 环境变量中的密钥优先于文件中的密钥
    pub fn with_env_overrides(mut self) -> Self {
        let read = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        if let Some(key) = read("OPENAI_API_KEY") {
            self.openai = Some(key);
        }
        if let Some(key) = read("ANTHROPIC_API_KEY") {
            self.anthropic = Some(key);
        }
        if let Some(key) = read("GOOGLE_API_KEY") {
            self.google = Some(key);
        }
        self
    }

    /// 指定提供方的密钥（空字符串视为未设置）
    pub fn key_for(&self, provider: Provider) -> Option<&str> {
        let key = match provider {
            Provider::OpenAi => &self.openai,
            Provider::Anthropic => &self.anthropic,
            Provider::Google => &self.google,
        };
        key.as_deref().filter(|k| !k.trim().is_empty())
    }

    fn save_with_secret(&self, path: &Path, secret: &str) -> Result<()> {
        let cipher = cipher_for(secret);
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let plaintext = serde_json::to_vec(self)?;
        let ciphertext = cipher
            .encrypt(&nonce, plaintext.as_ref())
            .map_err(|_| anyhow!("加密失败"))?;

        let mut payload = nonce.to_vec();
        payload.extend_from_slice(&ciphertext);
        fs::write(path, STANDARD.encode(payload))
            .with_context(|| format!("无法写入密钥文件: {}", path.display()))?;
        Ok(())
    }

    fn decrypt_file(path: &Path, secret: &str) -> Result<Self> {
        let encoded = fs::read_to_string(path)?;
        let payload = STANDARD.decode(encoded.trim())?;
        if payload.len() <= NONCE_LEN {
            anyhow::bail!("密钥文件过短");
        }
        let (nonce, ciphertext) = payload.split_at(NONCE_LEN);
        let plaintext = cipher_for(secret)
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| anyhow!("解密失败（MASTER_KEY 不匹配？）"))?;
        Ok(serde_json::from_slice(&plaintext)?)
    }
}

fn master_secret() -> String {
    std::env::var("MASTER_KEY").unwrap_or_else(|_| DEFAULT_MASTER_KEY.to_string())
}

fn cipher_for(secret: &str) -> Aes256Gcm {
    let digest = Sha256::digest(secret.as_bytes());
    Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&digest))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ApiKeys {
        ApiKeys {
            openai: Some("sk-test".into()),
            anthropic: None,
            google: Some("  ".into()),
        }
    }

    #[test]
    fn test_encrypt_then_decrypt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys.enc");
        sample().save_with_secret(&path, "secret").unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(!raw.contains("sk-test"));
        assert_eq!(ApiKeys::decrypt_file(&path, "secret").unwrap(), sample());
    }

    #[test]
    fn test_wrong_secret_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys.enc");
        sample().save_with_secret(&path, "secret").unwrap();
        assert!(ApiKeys::decrypt_file(&path, "other").is_err());
    }

    #[test]
    fn test_missing_or_corrupt_file_yields_empty_keys() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(ApiKeys::load(dir.path().join("absent.enc")), ApiKeys::default());

        let corrupt = dir.path().join("corrupt.enc");
        fs::write(&corrupt, "not base64 at all!").unwrap();
        assert_eq!(ApiKeys::load(&corrupt), ApiKeys::default());
    }

    #[test]
    fn test_key_for_ignores_blank() {
        let keys = sample();
        assert_eq!(keys.key_for(Provider::OpenAi), Some("sk-test"));
        assert_eq!(keys.key_for(Provider::Google), None);
        assert_eq!(keys.key_for(Provider::Anthropic), None);
    }
}
