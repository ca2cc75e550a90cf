// src/utils/receipt.rs

use std::path::Path;
use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use regex::Regex;

use crate::config::MAX_RECEIPT_BYTES;
use crate::error::AppError;

/// A decoded, validated receipt image ready to be stored.
#[derive(Debug)]
pub struct ReceiptImage {
    pub bytes: Vec<u8>,
    pub extension: &'static str,
}

fn data_url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^data:image/(jpeg|jpg|png);base64,(?<payload>[A-Za-z0-9+/=\s]+)$").unwrap()
    })
}

/// Parses and validates a receipt sent as a base64 data URL.
///
/// Only JPEG and PNG are accepted, the decoded payload must fit the size
/// ceiling, and the bytes must actually start with the matching magic
/// number; the declared media type alone is not trusted.
pub fn parse_receipt(data_url: &str) -> Result<ReceiptImage, AppError> {
    let captures = data_url_re().captures(data_url.trim()).ok_or_else(|| {
        AppError::BadRequest("Receipt must be a JPG or PNG image data URL".to_string())
    })?;

    let payload: String = captures["payload"]
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    // Quick upper bound before decoding: 4 base64 chars encode 3 bytes.
    if payload.len() / 4 * 3 > MAX_RECEIPT_BYTES + 3 {
        return Err(AppError::BadRequest(
            "Receipt file size must be under 5MB".to_string(),
        ));
    }

    let bytes = BASE64
        .decode(payload.as_bytes())
        .map_err(|_| AppError::BadRequest("Receipt image is not valid base64".to_string()))?;

    if bytes.len() > MAX_RECEIPT_BYTES {
        return Err(AppError::BadRequest(
            "Receipt file size must be under 5MB".to_string(),
        ));
    }

    let extension = match sniff_image(&bytes) {
        Some(ext) => ext,
        None => {
            return Err(AppError::BadRequest(
                "Only JPG and PNG receipts are allowed".to_string(),
            ));
        }
    };

    Ok(ReceiptImage { bytes, extension })
}

/// Identifies the image format from its leading bytes.
fn sniff_image(bytes: &[u8]) -> Option<&'static str> {
    const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    const JPEG_MAGIC: [u8; 3] = [0xFF, 0xD8, 0xFF];

    if bytes.starts_with(&PNG_MAGIC) {
        Some("png")
    } else if bytes.starts_with(&JPEG_MAGIC) {
        Some("jpg")
    } else {
        None
    }
}

/// Writes a validated receipt under the upload directory and returns the
/// relative path stored on the payment row. Blob storage backends can
/// replace this without touching the enrollment flow.
pub async fn store_receipt(
    upload_dir: &str,
    user_id: i64,
    receipt: &ReceiptImage,
) -> Result<String, AppError> {
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .as_millis();

    let filename = format!("receipt-{}-{}.{}", user_id, stamp, receipt.extension);
    let path = Path::new(upload_dir).join(&filename);

    tokio::fs::create_dir_all(upload_dir)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    tokio::fs::write(&path, &receipt.bytes)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    Ok(format!("/{}/{}", upload_dir.trim_matches('/'), filename))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_BYTES: [u8; 12] = [
        0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D,
    ];
    const JPEG_BYTES: [u8; 4] = [0xFF, 0xD8, 0xFF, 0xE0];

    fn data_url(media: &str, bytes: &[u8]) -> String {
        format!("data:image/{};base64,{}", media, BASE64.encode(bytes))
    }

    #[test]
    fn accepts_png_and_jpeg() {
        let png = parse_receipt(&data_url("png", &PNG_BYTES)).unwrap();
        assert_eq!(png.extension, "png");

        let jpg = parse_receipt(&data_url("jpeg", &JPEG_BYTES)).unwrap();
        assert_eq!(jpg.extension, "jpg");
    }

    #[test]
    fn rejects_non_image_data_url() {
        let err = parse_receipt("data:application/pdf;base64,AAAA");
        assert!(err.is_err());
    }

    #[test]
    fn rejects_mismatched_magic_bytes() {
        // Declared PNG, but the payload is plain text.
        let err = parse_receipt(&data_url("png", b"not an image at all"));
        assert!(err.is_err());
    }

    #[test]
    fn rejects_oversized_payload() {
        let big = vec![0xFFu8; MAX_RECEIPT_BYTES + 1];
        let err = parse_receipt(&data_url("jpeg", &big));
        assert!(err.is_err());
    }

    #[test]
    fn rejects_invalid_base64() {
        let err = parse_receipt("data:image/png;base64,@@@@");
        assert!(err.is_err());
    }
}
