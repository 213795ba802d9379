//! Uploads API Handlers
//! POST /api/uploads（商品画像・バナー画像）

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
};
use image::{GenericImageView, ImageFormat};
use sha2::{Digest, Sha256};
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use tracing::{info, warn};

use super::{error_response, ok, ApiResult, HandlerError};
use crate::models::UploadResponse;
use crate::AppState;

/// サムネイルの最大辺
pub const THUMBNAIL_SIZE: u32 = 400;

/// アップロード先の種類（保存先ディレクトリ名）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Product,
    Banner,
}

impl UploadKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "product" => Some(Self::Product),
            "banner" => Some(Self::Banner),
            _ => None,
        }
    }

    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Product => "products",
            Self::Banner => "banners",
        }
    }
}

/// デコード済み画像とサムネイル
#[derive(Debug)]
struct ProcessedImage {
    extension: &'static str,
    width: u32,
    height: u32,
    thumbnail_png: Vec<u8>,
}

/// POST /api/uploads - 画像アップロード
///
/// Parameters (multipart/form-data):
///   - file: 画像ファイル（必須、PNG/JPEG/GIF/WebP）
///   - kind: "product" | "banner"（必須）
///
/// 元画像と PNG サムネイルを `{UPLOAD_DIR}/{kind}s/` に保存する。
/// ファイル名は内容の SHA256 なので同じ画像は上書きになる。
pub async fn upload_image(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> ApiResult<UploadResponse> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut kind: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        error_response(StatusCode::BAD_REQUEST, format!("Field read error: {}", e))
    })? {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "file" => {
                let bytes = field.bytes().await.map_err(|e| {
                    error_response(StatusCode::BAD_REQUEST, format!("File read error: {}", e))
                })?;
                info!("📄 Upload received: {} bytes", bytes.len());
                file_data = Some(bytes.to_vec());
            }
            "kind" => {
                let text = field.text().await.map_err(|e| {
                    error_response(StatusCode::BAD_REQUEST, format!("kind error: {}", e))
                })?;
                kind = Some(text);
            }
            _ => {
                warn!("⚠️  Unknown field: {}", name);
            }
        }
    }

    let file_data = file_data
        .filter(|data| !data.is_empty())
        .ok_or_else(|| error_response(StatusCode::BAD_REQUEST, "No file uploaded".to_string()))?;

    let kind = kind
        .ok_or_else(|| error_response(StatusCode::BAD_REQUEST, "kind is required".to_string()))?;
    let kind = UploadKind::parse(&kind).ok_or_else(|| {
        error_response(
            StatusCode::BAD_REQUEST,
            "kind must be 'product' or 'banner'".to_string(),
        )
    })?;

    let digest = sha256_hex(&file_data);

    // デコードとリサイズは CPU 処理なのでブロッキングスレッドで
    let data = file_data.clone();
    let processed = tokio::task::spawn_blocking(move || process_image(&data))
        .await
        .map_err(|e| {
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Image task failed: {}", e),
            )
        })??;

    let target_dir = state.config.upload_dir.join(kind.dir_name());
    fs::create_dir_all(&target_dir).await.map_err(|e| {
        error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to create directory: {}", e),
        )
    })?;

    let file_name = format!("{}.{}", &digest[..32], processed.extension);
    let thumb_name = format!("{}_thumb.png", &digest[..32]);

    write_file(&target_dir.join(&file_name), &file_data).await?;
    write_file(&target_dir.join(&thumb_name), &processed.thumbnail_png).await?;

    info!(
        "✅ Image saved: {}/{} ({}x{})",
        kind.dir_name(),
        file_name,
        processed.width,
        processed.height
    );

    ok(UploadResponse {
        url: state
            .config
            .upload_url(&format!("{}/{}", kind.dir_name(), file_name)),
        thumbnail_url: state
            .config
            .upload_url(&format!("{}/{}", kind.dir_name(), thumb_name)),
        sha256: digest,
        width: processed.width,
        height: processed.height,
    })
}

// ========================================
// Helper Functions
// ========================================

fn process_image(data: &[u8]) -> Result<ProcessedImage, HandlerError> {
    let format = image::guess_format(data).map_err(|_| unsupported())?;
    let extension = match format {
        ImageFormat::Png => "png",
        ImageFormat::Jpeg => "jpg",
        ImageFormat::Gif => "gif",
        ImageFormat::WebP => "webp",
        _ => return Err(unsupported()),
    };

    let img = image::load_from_memory_with_format(data, format).map_err(|e| {
        error_response(StatusCode::BAD_REQUEST, format!("Invalid image: {}", e))
    })?;
    let (width, height) = img.dimensions();

    let mut thumbnail_png = Vec::new();
    img.thumbnail(THUMBNAIL_SIZE, THUMBNAIL_SIZE)
        .write_to(&mut Cursor::new(&mut thumbnail_png), ImageFormat::Png)
        .map_err(|e| {
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Thumbnail encode error: {}", e),
            )
        })?;

    Ok(ProcessedImage {
        extension,
        width,
        height,
        thumbnail_png,
    })
}

fn unsupported() -> HandlerError {
    error_response(
        StatusCode::UNSUPPORTED_MEDIA_TYPE,
        "Unsupported image format (use PNG, JPEG, GIF or WebP)".to_string(),
    )
}

async fn write_file(path: &Path, data: &[u8]) -> Result<(), HandlerError> {
    fs::write(path, data).await.map_err(|e| {
        error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to write file: {}", e),
        )
    })
}

/// SHA256 計算
fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
