use crate::models::tensor::{InputTensor, OutputTensor, TensorSpec};
use crate::Result;

/// 执行已加载模型的推理运行时
///
/// 实现会在请求间共享，内部可变状态需自行同步
pub trait InferenceEngine: Send + Sync {
    fn input_spec(&self) -> &TensorSpec;

    fn output_spec(&self) -> &TensorSpec;

    /// 执行一次同步推理
    fn infer(&self, input: &InputTensor) -> Result<OutputTensor>;

    /// 信息接口中显示的引擎名称
    fn name(&self) -> &str {
        "custom"
    }
}
