//! 設定
//! 環境変数から読み込む。未設定の場合は既定値を使う。

use std::{env, fmt, fmt::Display, path::PathBuf, str::FromStr};

use anyhow::{anyhow, Result};
use tracing::{info, warn};

use crate::catalog::DEFAULT_ITEMS_PER_PAGE;

/// 開発用の指紋鍵（本番では CARD_FINGERPRINT_KEY を設定する）
const DEV_CARD_FINGERPRINT_KEY: &str = "storefront-dev-fingerprint-key";

/// バックエンドの既定URL（ローカル）
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:5000";

/// サーバー設定
#[derive(Clone)]
pub struct AppConfig {
    pub port: u16,
    pub database_path: String,
    pub upload_dir: PathBuf,
    pub public_base_url: String,
    pub seed_catalog: bool,
    pub items_per_page: usize,
    /// カード指紋の HMAC 鍵
    pub card_fingerprint_key: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 5000,
            database_path: "data/storefront.db".to_string(),
            upload_dir: PathBuf::from("data/uploads"),
            public_base_url: DEFAULT_BACKEND_URL.to_string(),
            seed_catalog: true,
            items_per_page: DEFAULT_ITEMS_PER_PAGE,
            card_fingerprint_key: DEV_CARD_FINGERPRINT_KEY.to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            port: try_load("PORT", defaults.port)?,
            database_path: try_load("DATABASE_PATH", defaults.database_path)?,
            upload_dir: PathBuf::from(try_load(
                "UPLOAD_DIR",
                defaults.upload_dir.display().to_string(),
            )?),
            public_base_url: try_load("PUBLIC_BASE_URL", defaults.public_base_url)?
                .trim_end_matches('/')
                .to_string(),
            seed_catalog: try_load("SEED_CATALOG", defaults.seed_catalog)?,
            items_per_page: try_load("ITEMS_PER_PAGE", defaults.items_per_page)?.max(1),
            card_fingerprint_key: load_secret("CARD_FINGERPRINT_KEY", defaults.card_fingerprint_key),
        })
    }

    /// アップロードファイルの公開URL
    pub fn upload_url(&self, file_name: &str) -> String {
        format!("{}/uploads/{}", self.public_base_url, file_name)
    }
}

// 鍵はログに出さない
impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("database_path", &self.database_path)
            .field("upload_dir", &self.upload_dir)
            .field("public_base_url", &self.public_base_url)
            .field("seed_catalog", &self.seed_catalog)
            .field("items_per_page", &self.items_per_page)
            .field("card_fingerprint_key", &"<redacted>")
            .finish()
    }
}

/// APIクライアント設定
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub backend_url: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            backend_url: try_load("BACKEND_URL", DEFAULT_BACKEND_URL.to_string())?,
        })
    }
}

fn try_load<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("Invalid {key} value {raw:?}: {e}")),
        Err(_) => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}

fn load_secret(key: &str, default: String) -> String {
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw.trim().to_string(),
        _ => {
            warn!("⚠️ {key} not set, using the development key");
            default
        }
    }
}
