use crate::utils::error::ClassifyError;
use crate::Result;
use serde::Serialize;
use std::fmt;

/// 模型张量的元素类型
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ElementType {
    Uint8,
    Float32,
    Other(String),
}

impl ElementType {
    pub fn size_bytes(&self) -> Option<usize> {
        match self {
            ElementType::Uint8 => Some(1),
            ElementType::Float32 => Some(4),
            ElementType::Other(_) => None,
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementType::Uint8 => write!(f, "uint8"),
            ElementType::Float32 => write!(f, "float32"),
            ElementType::Other(name) => write!(f, "{}", name),
        }
    }
}

/// 模型输入或输出的名称、形状和类型
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TensorSpec {
    pub name: String,
    pub shape: Vec<usize>,
    pub dtype: ElementType,
}

impl TensorSpec {
    pub fn new(name: impl Into<String>, shape: Vec<usize>, dtype: ElementType) -> Self {
        Self {
            name: name.into(),
            shape,
            dtype,
        }
    }

    /// 由运行时维度构建，负值表示动态维度
    ///
    /// 第一维为批次维，动态时取 1；其他动态维度无法预先确定大小
    pub fn from_dims(name: impl Into<String>, dims: &[i64], dtype: ElementType) -> Result<Self> {
        let name = name.into();
        let mut shape = Vec::with_capacity(dims.len());

        for (axis, &dim) in dims.iter().enumerate() {
            match dim {
                d if d > 0 => shape.push(d as usize),
                _ if axis == 0 => shape.push(1),
                _ => {
                    return Err(ClassifyError::AssetLoad(format!(
                        "Tensor '{}' has dynamic dimension at axis {}: {:?}",
                        name, axis, dims
                    )))
                }
            }
        }

        Ok(Self { name, shape, dtype })
    }

    pub fn element_count(&self) -> usize {
        self.shape.iter().product()
    }

    /// 张量字节数，元素类型宽度未知时返回 None
    pub fn byte_len(&self) -> Option<usize> {
        self.dtype.size_bytes().map(|size| size * self.element_count())
    }
}

/// 带形状的 uint8 张量
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantizedTensor {
    shape: Vec<usize>,
    data: Vec<u8>,
}

/// 输入模型的原始 RGB 字节，NHWC，批次为 1
pub type InputTensor = QuantizedTensor;

/// 每个类别一个量化概率
pub type OutputTensor = QuantizedTensor;

impl QuantizedTensor {
    pub fn from_shape_vec(shape: Vec<usize>, data: Vec<u8>) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(ClassifyError::InvalidInput(format!(
                "Tensor shape {:?} needs {} values, got {}",
                shape,
                expected,
                data.len()
            )));
        }
        Ok(Self { shape, data })
    }

    /// 一维张量
    pub fn from_vec(data: Vec<u8>) -> Self {
        Self {
            shape: vec![data.len()],
            data,
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }
}

impl From<Vec<u8>> for QuantizedTensor {
    fn from(data: Vec<u8>) -> Self {
        Self::from_vec(data)
    }
}
