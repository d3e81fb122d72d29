use std::io::Cursor;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use image::{imageops::FilterType, ImageFormat};
use thiserror::Error;

/// Largest accepted upload, in decoded bytes
pub const MAX_LOGO_BYTES: usize = 1024 * 1024;
/// Longest side of a stored logo, in pixels
pub const MAX_LOGO_SIDE: u32 = 256;

#[derive(Debug, Error)]
pub enum LogoError {
    #[error("Logo is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("Logo is {0} bytes, more than the allowed 1 MiB")]
    TooLarge(usize),
    #[error("Logo could not be processed: {0}")]
    Image(#[from] image::ImageError),
}

/// Decodes an uploaded logo, shrinks it to fit the maximum side and re-encodes it as PNG base64.
pub fn process_logo(raw: &str) -> Result<String, LogoError> {
    let bytes = BASE64.decode(raw.trim())?;

    if bytes.len() > MAX_LOGO_BYTES {
        return Err(LogoError::TooLarge(bytes.len()));
    }

    let mut image = image::load_from_memory(&bytes)?;
    let (width, height) = (image.width(), image.height());

    if width > MAX_LOGO_SIDE || height > MAX_LOGO_SIDE {
        let (new_width, new_height) = fit_within(width, height, MAX_LOGO_SIDE);
        image = image.resize_exact(new_width, new_height, FilterType::CatmullRom);
    }

    let mut buffer = Vec::new();
    image.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)?;

    Ok(BASE64.encode(buffer))
}

fn fit_within(width: u32, height: u32, max: u32) -> (u32, u32) {
    let scale = f32::min(max as f32 / width as f32, max as f32 / height as f32);

    let new_width = (width as f32 * scale).round().max(1.0) as u32;
    let new_height = (height as f32 * scale).round().max(1.0) as u32;

    (new_width, new_height)
}
