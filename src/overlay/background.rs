// SPDX-License-Identifier: GPL-3.0-only
//! Background image decoding

use std::path::Path;

use image::ImageReader;

use crate::error::ImageError;

/// Decoded RGBA8 image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// Decode a PNG or JPEG file to RGBA8
///
/// The format is sniffed from the file contents, the extension is only a hint.
pub fn load_image(path: &Path) -> Result<Image, ImageError> {
    let decoded = ImageReader::open(path)?.with_guessed_format()?.decode()?;
    let rgba = decoded.to_rgba8();

    Ok(Image {
        width: rgba.width(),
        height: rgba.height(),
        rgba: rgba.into_raw(),
    })
}

impl Image {
    /// Stretch to `width`x`height` (nearest neighbour) as 32bpp BGRX
    ///
    /// Transparent areas are composited over black.
    pub fn to_bgrx_scaled(&self, width: u32, height: u32) -> Vec<u8> {
        let mut out = Vec::with_capacity(width as usize * height as usize * 4);
        if self.width == 0 || self.height == 0 {
            out.resize(width as usize * height as usize * 4, 0);
            return out;
        }

        for y in 0..height {
            let src_y = (y as u64 * self.height as u64 / height as u64) as usize;
            for x in 0..width {
                let src_x = (x as u64 * self.width as u64 / width as u64) as usize;
                let i = (src_y * self.width as usize + src_x) * 4;
                let [r, g, b, a] = [
                    self.rgba[i],
                    self.rgba[i + 1],
                    self.rgba[i + 2],
                    self.rgba[i + 3],
                ];
                out.extend_from_slice(&[
                    super::fade::shade(b, a),
                    super::fade::shade(g, a),
                    super::fade::shade(r, a),
                    0xff,
                ]);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, ImageFormat, Luma, Rgb, RgbImage};

    fn temp_path(name: &str, ext: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("hotplug-alert-{}-{}.{}", name, std::process::id(), ext))
    }

    fn close_to(actual: u8, expected: u8) -> bool {
        actual.abs_diff(expected) <= 8
    }

    #[test]
    fn test_load_rgb_png() {
        let path = temp_path("rgb", "png");
        RgbImage::from_raw(2, 1, vec![255, 0, 0, 0, 0, 255])
            .unwrap()
            .save(&path)
            .unwrap();

        let image = load_image(&path).unwrap();
        assert_eq!((image.width, image.height), (2, 1));
        assert_eq!(image.rgba, vec![255, 0, 0, 255, 0, 0, 255, 255]);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_load_grayscale_png() {
        let path = temp_path("gray", "png");
        GrayImage::from_pixel(1, 1, Luma([77])).save(&path).unwrap();

        let image = load_image(&path).unwrap();
        assert_eq!(image.rgba, vec![77, 77, 77, 255]);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_load_jpeg() {
        let path = temp_path("photo", "jpg");
        RgbImage::from_pixel(8, 8, Rgb([200, 40, 40])).save(&path).unwrap();

        let image = load_image(&path).unwrap();
        assert_eq!((image.width, image.height), (8, 8));
        let [r, g, b, a] = [image.rgba[0], image.rgba[1], image.rgba[2], image.rgba[3]];
        assert!(close_to(r, 200) && close_to(g, 40) && close_to(b, 40), "{r},{g},{b}");
        assert_eq!(a, 255);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_format_detected_from_contents() {
        // JPEG data behind a .png name still decodes
        let path = temp_path("misnamed", "png");
        RgbImage::from_pixel(4, 4, Rgb([0, 0, 255]))
            .save_with_format(&path, ImageFormat::Jpeg)
            .unwrap();

        let image = load_image(&path).unwrap();
        assert_eq!((image.width, image.height), (4, 4));
        assert!(close_to(image.rgba[2], 255));

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_missing_file() {
        let result = load_image(Path::new("/nonexistent/background.png"));
        assert!(matches!(result, Err(ImageError::Io(_))));
    }

    #[test]
    fn test_not_an_image() {
        let path = temp_path("garbage", "png");
        std::fs::write(&path, b"definitely not an image").unwrap();

        assert!(matches!(load_image(&path), Err(ImageError::Decode(_))));

        std::fs::remove_file(&path).unwrap();
    }
    #[test]
    fn test_scale_to_bgrx() {
        let image = Image {
            width: 2,
            height: 1,
            rgba: vec![255, 0, 0, 255, 0, 0, 255, 255],
        };

        let out = image.to_bgrx_scaled(4, 2);
        assert_eq!(out.len(), 4 * 2 * 4);
        // Left half red, right half blue, both rows
        assert_eq!(&out[0..4], &[0, 0, 255, 255]);
        assert_eq!(&out[4..8], &[0, 0, 255, 255]);
        assert_eq!(&out[8..12], &[255, 0, 0, 255]);
        assert_eq!(&out[16..20], &[0, 0, 255, 255]);
    }

    #[test]
    fn test_transparent_pixels_over_black() {
        let image = Image {
            width: 1,
            height: 1,
            rgba: vec![200, 100, 50, 0],
        };
        assert_eq!(image.to_bgrx_scaled(1, 1), vec![0, 0, 0, 255]);
    }
}
