//! Pixel-level decoy synthesis.

use std::io::Cursor;

use flipwright_config::DecoyConfig;
use flipwright_flip::ImageBlob;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

use crate::error::ProtectionError;

fn encode_png(image: &DynamicImage) -> Result<ImageBlob, ProtectionError> {
  let mut buffer = Cursor::new(Vec::new());
  image
    .write_to(&mut buffer, ImageFormat::Png)
    .map_err(|e| ProtectionError::Encode {
      message: e.to_string(),
    })?;
  Ok(ImageBlob::png(buffer.into_inner()))
}

/// Derive a decoy from a real search result.
///
/// The source is cropped to the slot size and mirrored, so the decoy is
/// never byte-identical to a publicly indexed image.
pub fn synthesize_decoy(source: &ImageBlob, config: &DecoyConfig) -> Result<ImageBlob, ProtectionError> {
  let decoded = image::load_from_memory(source.bytes()).map_err(|e| ProtectionError::Decode {
    message: e.to_string(),
  })?;

  let decoy = decoded
    .resize_to_fill(config.width, config.height, FilterType::Triangle)
    .fliph();

  encode_png(&decoy)
}

/// Blank image used when no decoy candidate exists.
pub fn placeholder_image(config: &DecoyConfig) -> Result<ImageBlob, ProtectionError> {
  let image = RgbImage::from_pixel(config.width, config.height, Rgb(config.placeholder_rgb));
  encode_png(&DynamicImage::ImageRgb8(image))
}
