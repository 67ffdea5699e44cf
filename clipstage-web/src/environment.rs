use image::ImageFormat;

use crate::error::Result;
use crate::io::{read_asset, AssetReader};

/// Equirectangular HDR image, linear RGBA32F, row 0 at the top.
pub struct EnvironmentImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<f32>,
}

pub async fn load_environment(reader: &impl AssetReader, url: &str) -> Result<EnvironmentImage> {
    log::info!("Loading environment {url}");
    let bytes = read_asset(reader, url).await?;
    let image = decode_hdr(&bytes)?;
    log::info!("Environment loaded ({}x{})", image.width, image.height);
    Ok(image)
}

/// Decode a Radiance `.hdr` file.
pub fn decode_hdr(bytes: &[u8]) -> Result<EnvironmentImage> {
    let decoded = image::load_from_memory_with_format(bytes, ImageFormat::Hdr)?.to_rgba32f();
    Ok(EnvironmentImage {
        width: decoded.width(),
        height: decoded.height(),
        rgba: decoded.into_raw(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoadError;
    use crate::io::MemoryReader;
    use futures::executor::block_on;

    /// 2x1 flat (non-RLE) Radiance image.
    fn tiny_hdr() -> Vec<u8> {
        let mut bytes = b"#?RADIANCE\nFORMAT=32-bit_rle_rgbe\n\n-Y 1 +X 2\n".to_vec();
        bytes.extend_from_slice(&[128, 128, 128, 129, 0, 0, 0, 0]);
        bytes
    }

    #[test]
    fn test_decode_hdr_dimensions() {
        let image = decode_hdr(&tiny_hdr()).unwrap();
        assert_eq!((image.width, image.height), (2, 1));
        assert_eq!(image.rgba.len(), 8);
        assert_eq!(image.rgba[3], 1.0);
    }

    #[test]
    fn test_invalid_bytes_are_image_error() {
        assert!(matches!(decode_hdr(b"definitely not radiance"), Err(LoadError::Image(_))));
    }

    #[test]
    fn test_load_environment_missing_file() {
        let reader = MemoryReader::new();
        let result = block_on(load_environment(&reader, "models/studio.hdr"));
        assert!(matches!(result, Err(LoadError::HttpStatus { status: 404, .. })));
    }

    #[test]
    fn test_load_environment_from_reader() {
        let mut reader = MemoryReader::new();
        reader.insert("models/studio.hdr", tiny_hdr());
        let image = block_on(load_environment(&reader, "models/studio.hdr")).unwrap();
        assert_eq!(image.width, 2);
    }
}
