use crate::models::InputTensor;
use crate::utils::error::ClassifyError;
use crate::Result;
use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbImage};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 缩放到模型输入尺寸时使用的插值方式
///
/// 应与模型训练时的缩放方式一致，只影响精度，不影响张量布局
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ResizeFilter {
    Nearest,
    #[default]
    Bilinear,
    CatmullRom,
    Lanczos3,
}

impl ResizeFilter {
    fn filter_type(self) -> FilterType {
        match self {
            ResizeFilter::Nearest => FilterType::Nearest,
            ResizeFilter::Bilinear => FilterType::Triangle,
            ResizeFilter::CatmullRom => FilterType::CatmullRom,
            ResizeFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

impl fmt::Display for ResizeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResizeFilter::Nearest => "nearest",
            ResizeFilter::Bilinear => "bilinear",
            ResizeFilter::CatmullRom => "catmull_rom",
            ResizeFilter::Lanczos3 => "lanczos3",
        };
        f.write_str(name)
    }
}

/// 将解码后的图像转换为量化模型读取的 uint8 NHWC 张量
#[derive(Debug, Clone)]
pub struct ImagePreprocessor {
    target_width: u32,
    target_height: u32,
    filter: ResizeFilter,
}

impl ImagePreprocessor {
    pub const CHANNELS: usize = 3;

    pub fn new(target_width: u32, target_height: u32, filter: ResizeFilter) -> Result<Self> {
        if target_width == 0 || target_height == 0 {
            return Err(ClassifyError::InvalidInput(format!(
                "Target size must be positive, got {}x{}",
                target_width, target_height
            )));
        }
        Ok(Self {
            target_width,
            target_height,
            filter,
        })
    }

    pub fn target_width(&self) -> u32 {
        self.target_width
    }

    pub fn target_height(&self) -> u32 {
        self.target_height
    }

    pub fn filter(&self) -> ResizeFilter {
        self.filter
    }

    /// 生成张量的字节长度
    pub fn tensor_len(&self) -> usize {
        self.target_width as usize * self.target_height as usize * Self::CHANNELS
    }

    /// 缩放 `image` 并按行优先输出交错的 R,G,B 字节
    ///
    /// 像素值原样输出，不做归一化。张量长度不等于 `expected_bytes` 时返回 `SizeMismatch`
    pub fn preprocess(&self, image: &DynamicImage, expected_bytes: usize) -> Result<InputTensor> {
        let resized = self.resize(image);
        let tensor = self.serialize(&resized)?;

        if tensor.len() != expected_bytes {
            return Err(ClassifyError::SizeMismatch {
                actual: tensor.len(),
                expected: expected_bytes,
            });
        }

        tracing::debug!(
            "Preprocessed {}x{} image into {} byte tensor",
            image.width(),
            image.height(),
            tensor.len()
        );

        Ok(tensor)
    }

    fn resize(&self, image: &DynamicImage) -> RgbImage {
        let rgb = image.to_rgb8();
        if rgb.dimensions() == (self.target_width, self.target_height) {
            return rgb;
        }
        imageops::resize(&rgb, self.target_width, self.target_height, self.filter.filter_type())
    }

    fn serialize(&self, image: &RgbImage) -> Result<InputTensor> {
        let (width, height) = image.dimensions();
        let mut data = Vec::with_capacity(self.tensor_len());

        for y in 0..height {
            for x in 0..width {
                let [r, g, b] = image.get_pixel(x, y).0;
                data.extend_from_slice(&[r, g, b]);
            }
        }

        InputTensor::from_shape_vec(
            vec![1, height as usize, width as usize, Self::CHANNELS],
            data,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, Rgba, RgbaImage};

    fn solid(width: u32, height: u32, color: [u8; 3]) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color)))
    }

    #[test]
    fn single_red_pixel_serializes_as_rgb() {
        let preprocessor = ImagePreprocessor::new(1, 1, ResizeFilter::Bilinear).unwrap();
        let tensor = preprocessor.preprocess(&solid(1, 1, [255, 0, 0]), 3).unwrap();
        assert_eq!(tensor.as_slice(), &[255, 0, 0]);
        assert_eq!(tensor.shape(), &[1, 1, 1, 3]);
    }

    #[test]
    fn tensor_length_is_width_height_channels() {
        let preprocessor = ImagePreprocessor::new(4, 3, ResizeFilter::Bilinear).unwrap();
        let tensor = preprocessor.preprocess(&solid(37, 19, [1, 2, 3]), 36).unwrap();
        assert_eq!(tensor.len(), 4 * 3 * 3);
        assert_eq!(tensor.shape(), &[1, 3, 4, 3]);
    }

    #[test]
    fn default_model_size_produces_150528_bytes() {
        let preprocessor = ImagePreprocessor::new(224, 224, ResizeFilter::Bilinear).unwrap();
        let tensor = preprocessor.preprocess(&solid(640, 480, [9, 9, 9]), 150_528).unwrap();
        assert_eq!(tensor.len(), 150_528);
        assert!(tensor.as_slice().iter().all(|&v| v == 9));
    }

    #[test]
    fn rows_are_emitted_top_to_bottom_left_to_right() {
        let mut image = RgbImage::new(2, 2);
        image.put_pixel(0, 0, Rgb([1, 2, 3]));
        image.put_pixel(1, 0, Rgb([4, 5, 6]));
        image.put_pixel(0, 1, Rgb([7, 8, 9]));
        image.put_pixel(1, 1, Rgb([10, 11, 12]));

        let preprocessor = ImagePreprocessor::new(2, 2, ResizeFilter::Nearest).unwrap();
        let tensor = preprocessor
            .preprocess(&DynamicImage::ImageRgb8(image), 12)
            .unwrap();
        assert_eq!(tensor.into_raw(), (1..=12).collect::<Vec<u8>>());
    }

    #[test]
    fn alpha_channel_is_dropped() {
        let image = RgbaImage::from_pixel(1, 1, Rgba([10, 20, 30, 0]));
        let preprocessor = ImagePreprocessor::new(1, 1, ResizeFilter::Bilinear).unwrap();
        let tensor = preprocessor
            .preprocess(&DynamicImage::ImageRgba8(image), 3)
            .unwrap();
        assert_eq!(tensor.as_slice(), &[10, 20, 30]);
    }

    #[test]
    fn inconsistent_expected_size_is_size_mismatch() {
        let preprocessor = ImagePreprocessor::new(2, 2, ResizeFilter::Bilinear).unwrap();
        let err = preprocessor.preprocess(&solid(8, 8, [0, 0, 0]), 150_528).unwrap_err();
        match err {
            ClassifyError::SizeMismatch { actual, expected } => {
                assert_eq!(actual, 12);
                assert_eq!(expected, 150_528);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn zero_target_is_rejected() {
        assert!(ImagePreprocessor::new(0, 224, ResizeFilter::Bilinear).is_err());
    }
}
