//! Image encoding: uploaded image bytes or rendered PDF pages → base64
//! [`EncodedImage`].
//!
//! Vision APIs accept images as base64 data-URIs embedded in the JSON request
//! body. Uploaded images are forwarded byte-for-byte under their declared
//! mime type; rendered pages are PNG-encoded because lossless output keeps
//! small table text legible.

use crate::pipeline::input::UploadedFile;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// A base64 image payload for a multimodal request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub mime_type: String,
    pub base64_data: String,
}

impl EncodedImage {
    /// `data:<mime>;base64,<data>` form used by the Responses API.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64_data)
    }

    /// Convert to the chat-provider representation.
    ///
    /// `detail: "high"` lets GPT-4-class models tile the image instead of
    /// reading a single 512 px overview, which loses small scorecard tables.
    pub fn to_image_data(&self) -> ImageData {
        ImageData::new(self.base64_data.clone(), self.mime_type.clone()).with_detail("high")
    }
}

/// Encode an uploaded image file, keeping its declared (lower-cased) mime type.
pub fn encode_upload(file: &UploadedFile) -> EncodedImage {
    let b64 = STANDARD.encode(&file.bytes);
    debug!("Encoded '{}' → {} bytes base64", file.name, b64.len());
    EncodedImage {
        mime_type: file.mime_essence(),
        base64_data: b64,
    }
}

/// Encode a rasterised PDF page as a base64 PNG.
pub fn encode_page(img: &DynamicImage) -> Result<EncodedImage, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;

    let b64 = STANDARD.encode(&buf);
    debug!("Encoded page image → {} bytes base64", b64.len());

    Ok(EncodedImage {
        mime_type: "image/png".to_string(),
        base64_data: b64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn encode_upload_keeps_bytes_and_mime() {
        let file = UploadedFile::new("scan.JPG", "Image/JPEG", vec![0xFF, 0xD8, 0xFF]);
        let img = encode_upload(&file);
        assert_eq!(img.mime_type, "image/jpeg");
        assert_eq!(STANDARD.decode(&img.base64_data).unwrap(), vec![0xFF, 0xD8, 0xFF]);
        assert_eq!(img.data_url(), "data:image/jpeg;base64,/9j/");
    }

    #[test]
    fn encode_small_page() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255])));
        let data = encode_page(&img).expect("encode should succeed");
        assert_eq!(data.mime_type, "image/png");
        let decoded = STANDARD.decode(&data.base64_data).expect("valid base64");
        assert_eq!(&decoded[1..4], b"PNG");
    }

    #[test]
    fn chat_image_data_conversion() {
        let img = EncodedImage {
            mime_type: "image/png".into(),
            base64_data: "AAAA".into(),
        };
        let data = img.to_image_data();
        assert_eq!(data.mime_type, "image/png");
        assert_eq!(data.data, "AAAA");
    }
}
