use std::path::Path;

use glyphmatch_core::{OcrError, RawImage, Result};

/// Decodes PNG, JPEG, TIFF and BMP bytes into RGBA buffers.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageDecoder;

impl ImageDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Decode in-memory image bytes. The format is sniffed from the data.
    pub fn decode(&self, data: &[u8]) -> Result<RawImage> {
        let format = image::guess_format(data).map_err(|e| OcrError::ImageDecode(e.to_string()))?;
        let img = image::load_from_memory_with_format(data, format)
            .map_err(|e| OcrError::ImageDecode(e.to_string()))?;

        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        tracing::debug!(?format, width, height, "decoded image");

        Ok(RawImage {
            data: rgba.into_raw(),
            width,
            height,
            channels: 4,
        })
    }

    pub fn decode_file(&self, path: impl AsRef<Path>) -> Result<RawImage> {
        let data = std::fs::read(path.as_ref())?;
        self.decode(&data)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};

    use super::*;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_fn(width, height, |x, _| {
            if x == 0 {
                Rgba([0, 0, 0, 255])
            } else {
                Rgba([255, 255, 255, 255])
            }
        });
        let mut buf = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn decodes_png_to_rgba() {
        let raw = ImageDecoder::new().decode(&png_bytes(3, 2)).unwrap();
        assert_eq!((raw.width, raw.height, raw.channels), (3, 2, 4));
        assert_eq!(raw.data.len(), 3 * 2 * 4);
        assert_eq!(&raw.data[..4], &[0, 0, 0, 255]);
        assert_eq!(&raw.data[4..8], &[255, 255, 255, 255]);
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let err = ImageDecoder::new().decode(b"not an image").unwrap_err();
        assert!(matches!(err, OcrError::ImageDecode(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = ImageDecoder::new()
            .decode_file("/nonexistent/page.png")
            .unwrap_err();
        assert!(matches!(err, OcrError::Io(_)));
    }
}
