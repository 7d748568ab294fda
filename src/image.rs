// Copyright 2023 Remi Bernotavicius

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use std::path::{Path, PathBuf};

/// Images are stored under this directory of the media root.
pub const RECIPE_IMAGE_DIR: &str = "recipes/images";

#[derive(thiserror::Error, Debug)]
pub enum ImageError {
    #[error("image must be a base64 data URI like data:image/png;base64,...")]
    NotDataUri,
    #[error("unsupported image type {0:?}")]
    UnsupportedType(String),
    #[error("image is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("image is empty")]
    Empty,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ImageError {
    /// Whether the error is the client's fault rather than the server's.
    pub fn is_invalid_input(&self) -> bool {
        !matches!(self, Self::Io(_))
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct DecodedImage {
    pub extension: &'static str,
    pub bytes: Vec<u8>,
}

fn extension_for(media_type: &str) -> Option<&'static str> {
    match media_type {
        "image/png" => Some("png"),
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

pub fn decode_data_uri(data: &str) -> Result<DecodedImage, ImageError> {
    let rest = data.strip_prefix("data:").ok_or(ImageError::NotDataUri)?;
    let (media_type, payload) = rest
        .split_once(";base64,")
        .ok_or(ImageError::NotDataUri)?;
    let extension = extension_for(media_type)
        .ok_or_else(|| ImageError::UnsupportedType(media_type.into()))?;
    let bytes = STANDARD.decode(payload.trim())?;
    if bytes.is_empty() {
        return Err(ImageError::Empty);
    }
    Ok(DecodedImage { extension, bytes })
}

/// Decodes the data URI and writes it under `media_root`, returning the path relative to it.
pub fn store_data_uri(media_root: &Path, data: &str) -> Result<String, ImageError> {
    let image = decode_data_uri(data)?;
    let dir: PathBuf = media_root.join(RECIPE_IMAGE_DIR);
    std::fs::create_dir_all(&dir)?;

    let file_name = format!("{}.{}", uuid::Uuid::new_v4().simple(), image.extension);
    std::fs::write(dir.join(&file_name), &image.bytes)?;
    log::debug!("stored {} byte image {file_name}", image.bytes.len());
    Ok(format!("{RECIPE_IMAGE_DIR}/{file_name}"))
}

/// Best effort; a missing file is not an error.
pub fn remove(media_root: &Path, relative: &str) {
    let path = media_root.join(relative);
    if let Err(error) = std::fs::remove_file(&path) {
        if error.kind() != std::io::ErrorKind::NotFound {
            log::warn!("failed to remove image {}: {error}", path.display());
        }
    }
}

#[cfg(test)]
pub const PIXEL_PNG: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNk+M9QDwADhgGAWjR9awAAAABJRU5ErkJggg==";

#[test]
fn decode_png() {
    let image = decode_data_uri(PIXEL_PNG).unwrap();
    assert_eq!(image.extension, "png");
    assert_eq!(&image.bytes[1..4], b"PNG");
}

#[test]
fn decode_rejects_garbage() {
    assert!(matches!(
        decode_data_uri("not an image"),
        Err(ImageError::NotDataUri)
    ));
    assert!(matches!(
        decode_data_uri("data:text/plain;base64,aGk="),
        Err(ImageError::UnsupportedType(_))
    ));
    assert!(matches!(
        decode_data_uri("data:image/png;base64,***"),
        Err(ImageError::Base64(_))
    ));
    assert!(matches!(
        decode_data_uri("data:image/png;base64,"),
        Err(ImageError::Empty)
    ));
}

#[test]
fn store_and_remove() {
    let media = tempfile::tempdir().unwrap();
    let relative = store_data_uri(media.path(), PIXEL_PNG).unwrap();
    assert!(relative.starts_with("recipes/images/"));
    assert!(relative.ends_with(".png"));
    assert!(media.path().join(&relative).exists());

    remove(media.path(), &relative);
    assert!(!media.path().join(&relative).exists());
    remove(media.path(), &relative);
}
