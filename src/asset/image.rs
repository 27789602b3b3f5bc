//! Image payload decoding for glTF textures
//!
//! PNG and JPEG go through the `image` crate. KTX2 containers are accepted
//! when they hold uncompressed RGBA8 data; supercompressed (Basis) payloads
//! are reported as undecodable and the texture is left unbound.

use base64::{prelude::BASE64_STANDARD, Engine};
use percent_encoding::percent_decode_str;

use crate::error::{Result, ViewerError};

const KTX2_IDENTIFIER: [u8; 12] = [
    0xAB, 0x4B, 0x54, 0x58, 0x20, 0x32, 0x30, 0xBB, 0x0D, 0x0A, 0x1A, 0x0A,
];
const VK_FORMAT_R8G8B8A8_UNORM: u32 = 37;
const VK_FORMAT_R8G8B8A8_SRGB: u32 = 43;
const KTX2_LEVEL_INDEX_OFFSET: usize = 80;

/// Decoded RGBA8 pixels
#[derive(Debug, Clone, PartialEq)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl ImageData {
    pub fn solid(rgba: [u8; 4]) -> Self {
        Self {
            width: 1,
            height: 1,
            pixels: rgba.to_vec(),
        }
    }

    pub fn byte_len(&self) -> usize {
        self.pixels.len()
    }
}

/// Decodes a `data:` URI; returns `None` for any other URI
pub fn decode_data_uri(uri: &str) -> Option<Result<Vec<u8>>> {
    let rest = uri.strip_prefix("data:")?;
    let Some((meta, payload)) = rest.split_once(',') else {
        return Some(Err(ViewerError::MissingResource(
            "data URI without payload".to_string(),
        )));
    };

    if meta.ends_with(";base64") {
        Some(BASE64_STANDARD.decode(payload.trim()).map_err(|e| {
            ViewerError::MissingResource(format!("data URI ({}): {}", meta, e))
        }))
    } else {
        Some(Ok(percent_decode_str(payload).collect()))
    }
}

/// Decodes an encoded image into RGBA8
///
/// Returns `Ok(None)` for recognised but unsupported encodings so the loader
/// can fall back to an untextured material slot.
pub fn decode_image(bytes: &[u8], mime_type: Option<&str>, label: &str) -> Result<Option<ImageData>> {
    if bytes.starts_with(&KTX2_IDENTIFIER) || mime_type == Some("image/ktx2") {
        return decode_ktx2(bytes, label);
    }

    let decoded = image::load_from_memory(bytes)
        .map_err(|e| ViewerError::MissingResource(format!("{}: {}", label, e)))?
        .to_rgba8();

    Ok(Some(ImageData {
        width: decoded.width(),
        height: decoded.height(),
        pixels: decoded.into_raw(),
    }))
}

fn decode_ktx2(bytes: &[u8], label: &str) -> Result<Option<ImageData>> {
    let u32_at = |offset: usize| -> Option<u32> {
        bytes
            .get(offset..offset + 4)
            .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    };
    let u64_at = |offset: usize| -> Option<u64> {
        bytes.get(offset..offset + 8).map(|b| {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(b);
            u64::from_le_bytes(raw)
        })
    };
    let truncated = || ViewerError::MissingResource(format!("{}: truncated KTX2 header", label));

    if !bytes.starts_with(&KTX2_IDENTIFIER) {
        return Err(ViewerError::MissingResource(format!(
            "{}: declared image/ktx2 but identifier is missing",
            label
        )));
    }

    let vk_format = u32_at(12).ok_or_else(truncated)?;
    let width = u32_at(20).ok_or_else(truncated)?;
    let height = u32_at(24).ok_or_else(truncated)?.max(1);
    let face_count = u32_at(36).ok_or_else(truncated)?;
    let supercompression = u32_at(44).ok_or_else(truncated)?;

    if supercompression != 0
        || face_count != 1
        || !matches!(vk_format, VK_FORMAT_R8G8B8A8_UNORM | VK_FORMAT_R8G8B8A8_SRGB)
    {
        log::warn!(
            "{}: KTX2 payload (vkFormat {}, supercompression {}) is not supported, texture ignored",
            label,
            vk_format,
            supercompression
        );
        return Ok(None);
    }

    let level_offset = u64_at(KTX2_LEVEL_INDEX_OFFSET).ok_or_else(truncated)? as usize;
    let level_length = u64_at(KTX2_LEVEL_INDEX_OFFSET + 8).ok_or_else(truncated)? as usize;
    let expected = width as usize * height as usize * 4;

    if level_length < expected {
        return Err(ViewerError::MissingResource(format!(
            "{}: KTX2 level 0 holds {} bytes, {} expected",
            label, level_length, expected
        )));
    }

    let pixels = bytes
        .get(level_offset..level_offset + expected)
        .ok_or_else(truncated)?
        .to_vec();

    Ok(Some(ImageData {
        width,
        height,
        pixels,
    }))
}

/// Encodes RGBA8 pixels as PNG; used to embed synthesized textures
pub fn encode_png(image: &ImageData) -> Result<Vec<u8>> {
    let mut out = std::io::Cursor::new(Vec::new());
    image::write_buffer_with_format(
        &mut out,
        &image.pixels,
        image.width,
        image.height,
        image::ExtendedColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .map_err(|e| ViewerError::InvalidArgument(format!("PNG encode failed: {}", e)))?;
    Ok(out.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ktx2_rgba(width: u32, height: u32, vk_format: u32, pixels: &[u8]) -> Vec<u8> {
        let mut out = KTX2_IDENTIFIER.to_vec();
        for value in [vk_format, 1, width, height, 0, 0, 1, 1, 0] {
            out.extend_from_slice(&value.to_le_bytes());
        }
        out.resize(KTX2_LEVEL_INDEX_OFFSET, 0);
        let data_offset = (KTX2_LEVEL_INDEX_OFFSET + 24) as u64;
        out.extend_from_slice(&data_offset.to_le_bytes());
        out.extend_from_slice(&(pixels.len() as u64).to_le_bytes());
        out.extend_from_slice(&(pixels.len() as u64).to_le_bytes());
        out.extend_from_slice(pixels);
        out
    }

    #[test]
    fn test_base64_data_uri() {
        let bytes = decode_data_uri("data:application/octet-stream;base64,AQID")
            .unwrap()
            .unwrap();
        assert_eq!(bytes, vec![1, 2, 3]);
        assert!(decode_data_uri("buffer.bin").is_none());
    }

    #[test]
    fn test_percent_encoded_data_uri_keeps_raw_bytes() {
        let bytes = decode_data_uri("data:application/octet-stream,%01%FF%80a").unwrap().unwrap();
        assert_eq!(bytes, vec![1, 0xFF, 0x80, b'a']);
    }

    #[test]
    fn test_png_round_trip() {
        let image = ImageData {
            width: 2,
            height: 1,
            pixels: vec![255, 0, 0, 255, 0, 255, 0, 255],
        };
        let png = encode_png(&image).unwrap();
        let decoded = decode_image(&png, Some("image/png"), "test").unwrap().unwrap();
        assert_eq!(decoded, image);
    }

    #[test]
    fn test_uncompressed_ktx2() {
        let pixels = [10u8, 20, 30, 255];
        let ktx = ktx2_rgba(1, 1, VK_FORMAT_R8G8B8A8_UNORM, &pixels);
        let decoded = decode_image(&ktx, None, "ktx").unwrap().unwrap();
        assert_eq!(decoded.pixels, pixels);
    }

    #[test]
    fn test_unsupported_ktx2_is_skipped() {
        let ktx = ktx2_rgba(1, 1, 131, &[0; 8]);
        assert!(decode_image(&ktx, Some("image/ktx2"), "bc1").unwrap().is_none());
    }

    #[test]
    fn test_garbage_is_an_error() {
        assert!(decode_image(&[0, 1, 2, 3], Some("image/png"), "junk").is_err());
    }
}
