use crate::utils::error::ClassifyError;
use crate::Result;
use base64::Engine;
use image::{DynamicImage, GenericImageView, ImageFormat};
use std::path::Path;

/// 允许的最大编码图像大小（字节）
pub const MAX_IMAGE_BYTES: usize = 50 * 1024 * 1024;

/// 解码后允许的最大边长（像素）
pub const MAX_IMAGE_DIMENSION: u32 = 16384;

pub struct ImageLoader;

impl ImageLoader {
    /// 解码 base64 字符串，可带 `data:image/...;base64,` 前缀
    pub fn from_base64(base64_data: &str) -> Result<DynamicImage> {
        let base64_clean = match base64_data.strip_prefix("data:") {
            Some(rest) => rest.split_once(',').map(|(_, data)| data).unwrap_or(rest),
            None => base64_data,
        };

        let image_bytes = base64::engine::general_purpose::STANDARD.decode(base64_clean.trim())?;

        Self::from_bytes(&image_bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<DynamicImage> {
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(ClassifyError::FileTooLarge(bytes.len(), MAX_IMAGE_BYTES));
        }

        match Self::detect_format(bytes) {
            Some(format) if !Self::is_supported_format(format) => {
                return Err(ClassifyError::UnsupportedFormat(format!("{:?}", format)));
            }
            _ => {}
        }

        let image = image::load_from_memory(bytes)?;
        Self::validate_dimensions(&image)?;

        Ok(image)
    }

    /// 从磁盘加载图像文件
    pub fn from_path(path: &Path) -> Result<DynamicImage> {
        if !path.exists() {
            return Err(ClassifyError::AssetLoad(format!(
                "Image not found: {}",
                path.display()
            )));
        }

        let bytes = std::fs::read(path).map_err(|e| {
            ClassifyError::AssetLoad(format!("Failed to read image {}: {}", path.display(), e))
        })?;

        Self::from_bytes(&bytes)
    }

    pub fn detect_format(bytes: &[u8]) -> Option<ImageFormat> {
        image::guess_format(bytes).ok()
    }

    pub fn is_supported_format(format: ImageFormat) -> bool {
        matches!(
            format,
            ImageFormat::Png
                | ImageFormat::Jpeg
                | ImageFormat::Bmp
                | ImageFormat::Gif
                | ImageFormat::Tiff
                | ImageFormat::WebP
        )
    }

    pub fn validate_dimensions(image: &DynamicImage) -> Result<()> {
        let (width, height) = image.dimensions();

        if width == 0 || height == 0 {
            return Err(ClassifyError::InvalidInput(format!(
                "Image has no pixels: {}x{}",
                width, height
            )));
        }

        if width > MAX_IMAGE_DIMENSION || height > MAX_IMAGE_DIMENSION {
            return Err(ClassifyError::InvalidInput(format!(
                "Image too large: {}x{}, maximum {}x{}",
                width, height, MAX_IMAGE_DIMENSION, MAX_IMAGE_DIMENSION
            )));
        }

        Ok(())
    }
}
