use crate::ViewerError;
use base64::{Engine, engine::general_purpose::STANDARD};
use image::{ImageFormat, ImageReader};
use std::io::Cursor;

const FALLBACK_MIME: &str = "image/jpeg";

/// A decoded frame image, ready to be displayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameImage {
    bytes: Vec<u8>,
    format: Option<ImageFormat>,
}

impl FrameImage {
    /// Decode the base64 `image` field of a frame message.
    ///
    /// The format is sniffed from magic bytes; unrecognised content is kept
    /// and displayed as JPEG, which is what producers send.
    pub fn decode(encoded: &str) -> Result<Self, ViewerError> {
        let bytes = STANDARD.decode(encoded)?;
        let format = image::guess_format(&bytes).ok();
        Ok(Self { bytes, format })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn format(&self) -> Option<ImageFormat> {
        self.format
    }

    pub fn mime_type(&self) -> &'static str {
        self.format
            .map(|format| format.to_mime_type())
            .unwrap_or(FALLBACK_MIME)
    }

    /// `data:` URL usable directly as an `<img>` source.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type(), STANDARD.encode(&self.bytes))
    }

    /// Width and height read from the image header, if it can be parsed.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        ImageReader::new(Cursor::new(&self.bytes))
            .with_guessed_format()
            .ok()?
            .into_dimensions()
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, RgbImage};

    fn encoded_jpeg(width: u32, height: u32) -> String {
        let img: RgbImage = ImageBuffer::from_pixel(width, height, image::Rgb([200, 30, 30]));
        let mut jpeg = Cursor::new(Vec::new());
        img.write_to(&mut jpeg, ImageFormat::Jpeg).unwrap();
        STANDARD.encode(jpeg.into_inner())
    }

    #[test]
    fn decodes_jpeg_frames() {
        let frame = FrameImage::decode(&encoded_jpeg(4, 3)).unwrap();

        assert_eq!(frame.format(), Some(ImageFormat::Jpeg));
        assert_eq!(frame.mime_type(), "image/jpeg");
        assert_eq!(frame.dimensions(), Some((4, 3)));
        assert!(frame.data_url().starts_with("data:image/jpeg;base64,/9j/"));
    }

    #[test]
    fn unknown_bytes_fall_back_to_jpeg_mime() {
        let frame = FrameImage::decode("AAEC").unwrap();

        assert_eq!(frame.bytes(), &[0, 1, 2]);
        assert_eq!(frame.format(), None);
        assert_eq!(frame.data_url(), "data:image/jpeg;base64,AAEC");
        assert_eq!(frame.dimensions(), None);
    }

    #[test]
    fn invalid_base64_is_an_error() {
        assert!(matches!(
            FrameImage::decode("not base64!"),
            Err(ViewerError::FrameDecode(_))
        ));
    }
}
