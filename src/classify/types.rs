use crate::image::ClassificationResult;
use serde::{Deserialize, Serialize};

/// 单次请求的分类选项
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClassifyOptions {
    /// 返回的排序预测数量，默认 1
    #[serde(default)]
    pub top_k: Option<usize>,

    /// 显示字符串的小数位数，默认取上下文设置
    #[serde(default)]
    pub precision: Option<usize>,
}

impl ClassifyOptions {
    pub const MAX_PRECISION: usize = 6;

    pub fn top_k(&self) -> usize {
        self.top_k.unwrap_or(1).max(1)
    }

    /// top_k 为 0 或精度超过上限时返回错误信息
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.top_k == Some(0) {
            return Err("top_k must be at least 1".to_string());
        }
        if let Some(precision) = self.precision {
            if precision > Self::MAX_PRECISION {
                return Err(format!(
                    "Precision must be at most {}, got {}",
                    Self::MAX_PRECISION,
                    precision
                ));
            }
        }
        Ok(())
    }
}

/// 单次分类结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    /// 得分最高的类别
    pub top: ClassificationResult,
    /// 按置信度降序排列的预测
    pub predictions: Vec<ClassificationResult>,
    /// `"<label> (<pct>%)"`
    pub display: String,
    /// 处理时间（秒）
    pub processing_time: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<ClassifyStats>,
}

/// 各阶段耗时
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifyStats {
    pub preprocess_time_ms: u64,
    pub inference_time_ms: u64,
    pub postprocess_time_ms: u64,
    pub input_bytes: usize,
    pub output_len: usize,
}
