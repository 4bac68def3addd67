use std::path::Path;

use crate::docx::{ImageFormat, Picture};

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
const BUNDLED_LOGO: &[u8] = include_bytes!("../assets/logo.png");

/// Picks the explicit logo if given, else the configured default, else the
/// logo compiled into the binary. A bad explicit logo means the header is
/// rendered without an image.
pub fn load_logo(explicit: Option<&Path>, default: &Path) -> Option<Picture> {
    match explicit {
        Some(path) => match read_picture(path) {
            Ok(picture) => Some(picture),
            Err(reason) => {
                tracing::warn!(path = %path.display(), %reason, "ignoring logo");
                None
            }
        },
        None => match read_picture(default) {
            Ok(picture) => Some(picture),
            Err(reason) => {
                tracing::debug!(path = %default.display(), %reason, "using the built-in logo");
                sniff(BUNDLED_LOGO.to_vec())
            }
        },
    }
}

fn read_picture(path: &Path) -> Result<Picture, String> {
    let data = std::fs::read(path).map_err(|err| err.to_string())?;
    sniff(data).ok_or_else(|| "not a PNG or JPEG image".to_string())
}

/// Recognizes PNG and JPEG data and reads its pixel size from the header.
pub fn sniff(data: Vec<u8>) -> Option<Picture> {
    let (format, (width_px, height_px)) = if data.starts_with(&PNG_SIGNATURE) {
        (ImageFormat::Png, png_size(&data)?)
    } else if data.starts_with(&[0xFF, 0xD8]) {
        (ImageFormat::Jpeg, jpeg_size(&data)?)
    } else {
        return None;
    };
    if width_px == 0 || height_px == 0 {
        return None;
    }
    Some(Picture {
        format,
        width_px,
        height_px,
        data,
    })
}

fn be_u16(data: &[u8], at: usize) -> Option<u16> {
    let bytes = data.get(at..at + 2)?;
    Some(u16::from_be_bytes([bytes[0], bytes[1]]))
}

fn be_u32(data: &[u8], at: usize) -> Option<u32> {
    let bytes = data.get(at..at + 4)?;
    Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn png_size(data: &[u8]) -> Option<(u32, u32)> {
    // IHDR is always the first chunk.
    if data.get(12..16)? != b"IHDR" {
        return None;
    }
    Some((be_u32(data, 16)?, be_u32(data, 20)?))
}

fn jpeg_size(data: &[u8]) -> Option<(u32, u32)> {
    let mut at = 2;
    loop {
        if *data.get(at)? != 0xFF {
            return None;
        }
        let marker = *data.get(at + 1)?;
        match marker {
            0xFF => at += 1,
            0x01 | 0xD0..=0xD7 => at += 2,
            0xC0..=0xCF if !matches!(marker, 0xC4 | 0xC8 | 0xCC) => {
                let height = be_u16(data, at + 5)?;
                let width = be_u16(data, at + 7)?;
                return Some((u32::from(width), u32::from(height)));
            }
            0xD9 | 0xDA => return None,
            _ => at += 2 + usize::from(be_u16(data, at + 2)?),
        }
    }
}
