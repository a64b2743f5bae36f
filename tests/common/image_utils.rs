//! Image checks for rendered plots.

use image::{DynamicImage, GenericImageView, ImageError, ImageFormat};
use std::collections::HashSet;
use std::path::Path;

/// Load an image from a file
pub fn load_image(path: &Path) -> Result<DynamicImage, ImageError> {
    image::open(path)
}

/// Detect the format of a file from its leading bytes
pub fn detect_image_format(path: &Path) -> Option<ImageFormat> {
    let bytes = std::fs::read(path).ok()?;
    image::guess_format(&bytes).ok()
}

/// Assert that the file at `path` is a PNG of the given size
pub fn assert_png(path: &Path, width: u32, height: u32) {
    assert_eq!(
        detect_image_format(path),
        Some(ImageFormat::Png),
        "{} is not a PNG",
        path.display()
    );
    let img = load_image(path).expect("readable image");
    assert_eq!(
        img.dimensions(),
        (width, height),
        "Image dimensions mismatch for {}",
        path.display()
    );
}

/// Number of distinct colors in an image
pub fn distinct_colors(img: &DynamicImage) -> usize {
    img.to_rgba8()
        .pixels()
        .map(|p| p.0)
        .collect::<HashSet<_>>()
        .len()
}
