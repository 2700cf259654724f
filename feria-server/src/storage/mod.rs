//! File Storage
//!
//! Stores uploaded blobs (payment proofs, product images) under
//! `work_dir/uploads/` with content-addressed filenames (SHA-256 prefix), so
//! the same file uploaded twice maps to the same stable path. Replacing a
//! blob deletes the prior one at the call site via [`FileStorage::delete`].

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use shared::{AppError, AppResult, ErrorCode};

/// Extensions accepted for payment proofs (images + PDF)
const PROOF_EXTENSIONS: &[&str] = &["jpeg", "jpg", "png", "gif", "webp", "pdf"];

/// Extensions accepted for product images
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp"];

/// JPEG quality for product images (keeps files small without visible loss)
const JPEG_QUALITY: u8 = 85;

/// File storage rooted at `work_dir/uploads`
#[derive(Debug, Clone)]
pub struct FileStorage {
    uploads_dir: PathBuf,
    max_file_size: usize,
}

/// Calculate SHA256 hash of data
fn content_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

fn extension_of(filename: &str) -> AppResult<String> {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|s| s.to_lowercase())
        .ok_or_else(|| AppError::validation(format!("Invalid file extension for: {filename}")))
}

impl FileStorage {
    pub fn new(uploads_dir: PathBuf, max_file_size: usize) -> Self {
        Self {
            uploads_dir,
            max_file_size,
        }
    }

    /// Store a payment proof blob; returns its stable URL path
    ///
    /// Accepts images and PDF up to the configured size limit. The filename
    /// is the SHA-256 prefix of the content, so re-uploading identical bytes
    /// yields the same path.
    pub fn save_payment_proof(&self, data: &[u8], original_name: &str) -> AppResult<String> {
        if data.is_empty() {
            return Err(AppError::new(ErrorCode::PaymentProofRequired));
        }
        if data.len() > self.max_file_size {
            return Err(AppError::validation(format!(
                "File too large. Maximum size is {} bytes",
                self.max_file_size
            )));
        }

        let ext = extension_of(original_name)?;
        if !PROOF_EXTENSIONS.contains(&ext.as_str()) {
            return Err(AppError::new(ErrorCode::PaymentProofInvalid));
        }

        // 校验内容确实是声称的类型
        if ext == "pdf" {
            if !data.starts_with(b"%PDF") {
                return Err(AppError::new(ErrorCode::PaymentProofInvalid));
            }
        } else if image::load_from_memory(data).is_err() {
            return Err(AppError::new(ErrorCode::PaymentProofInvalid));
        }

        let hash = content_hash(data);
        let filename = format!("{}.{}", &hash[..16], ext);
        self.write_file("payments", &filename, data)
    }

    /// Store a product image; returns its stable URL path
    ///
    /// Validates the upload is a real image, recompresses to JPEG and names
    /// the file by the hash of the compressed bytes.
    pub fn save_product_image(&self, data: &[u8], original_name: &str) -> AppResult<String> {
        if data.is_empty() {
            return Err(AppError::validation("Empty file provided"));
        }
        if data.len() > self.max_file_size {
            return Err(AppError::validation(format!(
                "File too large. Maximum size is {} bytes",
                self.max_file_size
            )));
        }

        let ext = extension_of(original_name)?;
        if !IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            return Err(AppError::validation(format!(
                "Unsupported file format '{}'. Supported: {}",
                ext,
                IMAGE_EXTENSIONS.join(", ")
            )));
        }

        let img = image::load_from_memory(data)
            .map_err(|e| AppError::validation(format!("Invalid image: {e}")))?;

        // Recompress to JPEG with fixed quality
        let mut buffer = Vec::new();
        {
            let mut cursor = Cursor::new(&mut buffer);
            let rgb_img = img.to_rgb8();
            let encoder =
                image::codecs::jpeg::JpegEncoder::new_with_quality(&mut cursor, JPEG_QUALITY);
            rgb_img
                .write_with_encoder(encoder)
                .map_err(|e| AppError::internal(format!("Failed to compress image: {e}")))?;
        }

        let hash = content_hash(&buffer);
        let filename = format!("{}.jpg", &hash[..16]);
        self.write_file("products", &filename, &buffer)
    }

    fn write_file(&self, category: &str, filename: &str, data: &[u8]) -> AppResult<String> {
        let dir = self.uploads_dir.join(category);
        fs::create_dir_all(&dir)
            .map_err(|e| AppError::storage(format!("Failed to create upload dir: {e}")))?;

        let path = dir.join(filename);
        if path.exists() {
            tracing::debug!(file = %filename, "Duplicate upload, reusing existing file");
        } else {
            fs::write(&path, data)
                .map_err(|e| AppError::storage(format!("Failed to save file: {e}")))?;
            tracing::info!(file = %filename, size = data.len(), "File stored");
        }
        Ok(format!("/uploads/{category}/{filename}"))
    }

    /// Best-effort removal of a previously stored blob by its URL path
    ///
    /// Used when a proof or image is replaced. Failures are logged, never
    /// propagated; the database already points at the new blob.
    pub fn delete(&self, url: &str) {
        let Some(relative) = url.strip_prefix("/uploads/") else {
            return;
        };
        if relative.contains("..") {
            tracing::warn!(url = %url, "Refusing to delete suspicious upload path");
            return;
        }
        let path = self.uploads_dir.join(relative);
        if path.exists()
            && let Err(e) = fs::remove_file(&path)
        {
            tracing::warn!(url = %url, error = %e, "Failed to delete old upload");
        }
    }

    /// Resolve a stored file for serving; rejects path traversal
    pub fn resolve(&self, category: &str, filename: &str) -> AppResult<PathBuf> {
        if filename.contains("..") || filename.contains('/') || category.contains("..") {
            return Err(AppError::invalid("Invalid file path"));
        }
        let path = self.uploads_dir.join(category).join(filename);
        if !path.is_file() {
            return Err(AppError::not_found("File"));
        }
        Ok(path)
    }
}
