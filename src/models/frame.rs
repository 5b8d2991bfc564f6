use image::{GrayImage, RgbImage, RgbaImage};

/// Pixel layout of a camera frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// One luminance byte per pixel
    Luma,
    /// Interleaved R, G, B
    Rgb,
    /// Interleaved R, G, B, A
    Rgba,
}

impl PixelFormat {
    /// Bytes per pixel
    pub fn channels(&self) -> usize {
        match self {
            PixelFormat::Luma => 1,
            PixelFormat::Rgb => 3,
            PixelFormat::Rgba => 4,
        }
    }
}

/// One still image sampled from a camera stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Pixels per row
    pub width: usize,
    /// Rows
    pub height: usize,
    /// Layout of `data`
    pub format: PixelFormat,
    /// Row-major pixels, no row padding
    pub data: Vec<u8>,
}

impl Frame {
    /// Wrap a raw buffer; `data` must hold `width * height` pixels
    pub fn new(width: usize, height: usize, format: PixelFormat, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            format,
            data,
        }
    }

    /// Whether the buffer holds every pixel the dimensions promise
    pub fn is_complete(&self) -> bool {
        self.width
            .checked_mul(self.height)
            .and_then(|n| n.checked_mul(self.format.channels()))
            .is_some_and(|needed| self.data.len() >= needed)
    }
}

impl From<RgbImage> for Frame {
    fn from(image: RgbImage) -> Self {
        let (width, height) = image.dimensions();
        Frame::new(width as usize, height as usize, PixelFormat::Rgb, image.into_raw())
    }
}

impl From<RgbaImage> for Frame {
    fn from(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Frame::new(width as usize, height as usize, PixelFormat::Rgba, image.into_raw())
    }
}

impl From<GrayImage> for Frame {
    fn from(image: GrayImage) -> Self {
        let (width, height) = image.dimensions();
        Frame::new(width as usize, height as usize, PixelFormat::Luma, image.into_raw())
    }
}
