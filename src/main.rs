use anyhow::Result;
use storefront_api::config::AppConfig;

// ========================================
// メイン
// ========================================

#[tokio::main]
async fn main() -> Result<()> {
    // ログ初期化
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = AppConfig::from_env()?;
    storefront_api::start_server(config).await
}
