/// Raster (PNG) and vector (SVG) output for encoded symbols
use std::fmt::Write as _;
use std::io::Cursor;

use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};
use thiserror::Error;

use crate::models::OpticalSymbol;

/// Module colour for dark modules
pub const DEFAULT_DARK: Rgb<u8> = Rgb([0x1f, 0x29, 0x37]);
/// Module colour for light modules and the quiet zone
pub const DEFAULT_LIGHT: Rgb<u8> = Rgb([0xff, 0xff, 0xff]);

/// Image output failure
#[derive(Debug, Error)]
pub enum RenderError {
    /// The `image` crate could not encode the raster
    #[error("image encoding failed: {0}")]
    Image(#[from] image::ImageError),
}

/// Colours and margin used when drawing a symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Light margin around the symbol, in modules
    pub quiet_zone: u32,
    /// Dark module colour
    pub dark: Rgb<u8>,
    /// Light module and margin colour
    pub light: Rgb<u8>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            quiet_zone: 4,
            dark: DEFAULT_DARK,
            light: DEFAULT_LIGHT,
        }
    }
}

impl RenderOptions {
    /// Same colours with a different margin
    pub fn with_quiet_zone(mut self, quiet_zone: u32) -> Self {
        self.quiet_zone = quiet_zone;
        self
    }
}

fn hex(color: Rgb<u8>) -> String {
    let [r, g, b] = color.0;
    format!("#{r:02x}{g:02x}{b:02x}")
}

impl OpticalSymbol {
    /// Side length in pixels of the rendered image
    pub fn pixel_size(&self, options: &RenderOptions) -> u32 {
        let modules = self.size() as u32 + 2 * options.quiet_zone;
        modules.saturating_mul(self.scale)
    }

    /// Draw the symbol, `scale` pixels per module
    pub fn to_image(&self, options: &RenderOptions) -> RgbImage {
        let side = self.pixel_size(options);
        let scale = self.scale.max(1);
        let offset = options.quiet_zone;

        RgbImage::from_fn(side, side, |px, py| {
            let mx = px / scale;
            let my = py / scale;
            let inside = mx >= offset && my >= offset;
            if inside && self.is_dark((mx - offset) as usize, (my - offset) as usize) {
                options.dark
            } else {
                options.light
            }
        })
    }

    /// PNG bytes of [`Self::to_image`]
    pub fn to_png(&self, options: &RenderOptions) -> Result<Vec<u8>, RenderError> {
        let image = DynamicImage::ImageRgb8(self.to_image(options));
        let mut bytes = Vec::new();
        image.write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)?;
        Ok(bytes)
    }

    /// Standalone SVG document, one unit per module
    pub fn to_svg(&self, options: &RenderOptions) -> String {
        let size = self.size();
        let q = options.quiet_zone as usize;
        let view = size + 2 * q;
        let pixels = self.pixel_size(options);

        let mut path = String::new();
        for y in 0..size {
            for x in 0..size {
                if self.is_dark(x, y) {
                    let _ = write!(path, "M{},{}h1v1h-1z", x + q, y + q);
                }
            }
        }

        format!(
            concat!(
                r#"<svg xmlns="http://www.w3.org/2000/svg" version="1.1" "#,
                r#"width="{px}" height="{px}" viewBox="0 0 {view} {view}" shape-rendering="crispEdges">"#,
                r#"<rect width="{view}" height="{view}" fill="{light}"/>"#,
                r#"<path fill="{dark}" d="{path}"/>"#,
                "</svg>\n"
            ),
            px = pixels,
            view = view,
            light = hex(options.light),
            dark = hex(options.dark),
            path = path,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BitMatrix, ECLevel, MaskPattern, Version};

    fn tiny_symbol(scale: u32) -> OpticalSymbol {
        let mut modules = BitMatrix::square(21);
        modules.set(0, 0, true);
        modules.set(20, 20, true);
        OpticalSymbol {
            modules,
            version: Version::MIN,
            ec_level: ECLevel::M,
            mask_pattern: MaskPattern::Pattern0,
            scale,
        }
    }

    #[test]
    fn test_image_layout() {
        let symbol = tiny_symbol(3);
        let options = RenderOptions::default().with_quiet_zone(2);
        let img = symbol.to_image(&options);
        assert_eq!(img.dimensions(), (75, 75));
        assert_eq!(*img.get_pixel(0, 0), DEFAULT_LIGHT);
        assert_eq!(*img.get_pixel(6, 6), DEFAULT_DARK);
        assert_eq!(*img.get_pixel(8, 8), DEFAULT_DARK);
        assert_eq!(*img.get_pixel(9, 6), DEFAULT_LIGHT);
        assert_eq!(*img.get_pixel(66, 66), DEFAULT_DARK);
    }

    #[test]
    fn test_png_signature() {
        let png = tiny_symbol(2).to_png(&RenderOptions::default()).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
        let decoded = image::load_from_memory(&png).unwrap().to_rgb8();
        assert_eq!(decoded.dimensions(), (58, 58));
    }

    #[test]
    fn test_svg_document() {
        let svg = tiny_symbol(4).to_svg(&RenderOptions::default());
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains(r#"viewBox="0 0 29 29""#));
        assert!(svg.contains(r#"width="116""#));
        assert!(svg.contains("#1f2937"));
        assert!(svg.contains("M4,4h1v1h-1z"));
        assert!(svg.contains("M24,24h1v1h-1z"));
    }
}
