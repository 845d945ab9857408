use crate::models::{LabelSet, OutputTensor};
use crate::utils::error::ClassifyError;
use crate::Result;
use serde::{Deserialize, Serialize};

/// 量化概率的缩放系数
pub const QUANTIZATION_SCALE: f32 = 255.0;

/// 单个类别及其置信度
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub label: String,
    /// 反量化后的概率，范围 [0, 1]
    pub confidence: f32,
}

/// 将 uint8 概率反量化
pub fn dequantize(value: u8) -> f32 {
    value as f32 / QUANTIZATION_SCALE
}

fn check_lengths(output: &OutputTensor, labels: &LabelSet) -> Result<()> {
    if output.len() != labels.len() {
        return Err(ClassifyError::LengthMismatch {
            outputs: output.len(),
            labels: labels.len(),
        });
    }
    if output.is_empty() {
        return Err(ClassifyError::InvalidInput("Output tensor is empty".to_string()));
    }
    Ok(())
}

fn result_at(output: &OutputTensor, labels: &LabelSet, index: usize) -> ClassificationResult {
    ClassificationResult {
        label: labels.get(index).unwrap_or_default().to_string(),
        confidence: dequantize(output.as_slice()[index]),
    }
}

/// 选出置信度最高的标签
///
/// 只有严格大于当前最大值时才更新，并列时取索引最小者
pub fn postprocess(output: &OutputTensor, labels: &LabelSet) -> Result<ClassificationResult> {
    check_lengths(output, labels)?;

    let probabilities: Vec<f32> = output.as_slice().iter().copied().map(dequantize).collect();

    let mut max_index = 0;
    for (i, &probability) in probabilities.iter().enumerate().skip(1) {
        if probability > probabilities[max_index] {
            max_index = i;
        }
    }

    Ok(result_at(output, labels, max_index))
}

/// 置信度最高的 `k` 个标签，降序，并列按索引顺序
pub fn top_k(output: &OutputTensor, labels: &LabelSet, k: usize) -> Result<Vec<ClassificationResult>> {
    check_lengths(output, labels)?;

    let values = output.as_slice();
    let mut indices: Vec<usize> = (0..values.len()).collect();
    // 稳定排序，相等值保持索引顺序
    indices.sort_by(|&a, &b| values[b].cmp(&values[a]));

    Ok(indices
        .into_iter()
        .take(k)
        .map(|i| result_at(output, labels, i))
        .collect())
}

/// 结果格式化器
pub struct ResultFormatter;

impl ResultFormatter {
    /// `"<label> (<confidence*100>%)"`，小数位数固定
    pub fn format_display(result: &ClassificationResult, precision: usize) -> String {
        format!(
            "{} ({:.*}%)",
            result.label,
            precision,
            result.confidence * 100.0
        )
    }

    /// 每个预测一行 `label<TAB>confidence`
    pub fn format_plain_text(results: &[ClassificationResult], precision: usize) -> String {
        results
            .iter()
            .map(|r| format!("{}\t{:.*}", r.label, precision + 2, r.confidence))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(names: &[&str]) -> LabelSet {
        names.iter().copied().collect()
    }

    #[test]
    fn picks_highest_confidence() {
        let output = OutputTensor::from_vec(vec![10, 250, 0]);
        let result = postprocess(&output, &labels(&["cat", "dog", "bird"])).unwrap();
        assert_eq!(result.label, "dog");
        assert!((result.confidence - 0.980).abs() < 1e-3);
    }

    #[test]
    fn ties_resolve_to_lowest_index() {
        let output = OutputTensor::from_vec(vec![200, 200, 50]);
        let result = postprocess(&output, &labels(&["a", "b", "c"])).unwrap();
        assert_eq!(result.label, "a");
    }

    #[test]
    fn all_zero_output_picks_first_label() {
        let output = OutputTensor::from_vec(vec![0, 0, 0]);
        let result = postprocess(&output, &labels(&["a", "b", "c"])).unwrap();
        assert_eq!(result.label, "a");
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn length_mismatch_is_rejected() {
        let output = OutputTensor::from_vec(vec![1, 2, 3, 4]);
        let err = postprocess(&output, &labels(&["a", "b", "c"])).unwrap_err();
        assert!(matches!(err, ClassifyError::LengthMismatch { outputs: 4, labels: 3 }));
    }

    #[test]
    fn empty_output_is_rejected() {
        let err = postprocess(&OutputTensor::from_vec(Vec::new()), &LabelSet::new(Vec::new())).unwrap_err();
        assert!(matches!(err, ClassifyError::InvalidInput(_)));
    }

    #[test]
    fn postprocess_is_repeatable() {
        let output = OutputTensor::from_vec(vec![3, 90, 90, 17]);
        let names = labels(&["w", "x", "y", "z"]);
        let first = postprocess(&output, &names).unwrap();
        let second = postprocess(&output, &names).unwrap();
        assert_eq!(first, second);
        assert_eq!(output.as_slice(), &[3, 90, 90, 17]);
    }

    #[test]
    fn multi_axis_output_is_read_flat() {
        let output = OutputTensor::from_shape_vec(vec![1, 3], vec![5, 6, 255]).unwrap();
        let result = postprocess(&output, &labels(&["a", "b", "c"])).unwrap();
        assert_eq!(result.label, "c");
        assert_eq!(result.confidence, 1.0);
    }

    #[test]
    fn top_k_orders_by_confidence_then_index() {
        let output = OutputTensor::from_vec(vec![40, 200, 40, 255]);
        let results = top_k(&output, &labels(&["a", "b", "c", "d"]), 3).unwrap();
        let names: Vec<_> = results.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(names, vec!["d", "b", "a"]);
    }

    #[test]
    fn top_k_agrees_with_postprocess() {
        let output = OutputTensor::from_vec(vec![200, 200, 50]);
        let names = labels(&["a", "b", "c"]);
        let best = top_k(&output, &names, 1).unwrap();
        assert_eq!(best, vec![postprocess(&output, &names).unwrap()]);
    }

    #[test]
    fn top_k_larger_than_labels_returns_all() {
        let output = OutputTensor::from_vec(vec![1, 2]);
        assert_eq!(top_k(&output, &labels(&["a", "b"]), 10).unwrap().len(), 2);
    }

    #[test]
    fn display_uses_fixed_precision() {
        let result = ClassificationResult {
            label: "dog".to_string(),
            confidence: dequantize(250),
        };
        assert_eq!(ResultFormatter::format_display(&result, 2), "dog (98.04%)");
        assert_eq!(ResultFormatter::format_display(&result, 0), "dog (98%)");
    }

    #[test]
    fn full_confidence_displays_as_hundred() {
        let result = ClassificationResult {
            label: "goldfish".to_string(),
            confidence: 1.0,
        };
        assert_eq!(ResultFormatter::format_display(&result, 2), "goldfish (100.00%)");
    }
}
