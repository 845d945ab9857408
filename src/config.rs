use crate::classify::ClassifyOptions;
use crate::image::ResizeFilter;
use crate::utils::error::ClassifyError;
use crate::Result;
use std::path::PathBuf;

pub const DEFAULT_INPUT_SIZE: u32 = 224;
pub const DEFAULT_DISPLAY_PRECISION: usize = 2;

#[derive(Debug, Clone)]
pub struct Config {
    /// 服务器绑定地址
    pub bind_addr: String,

    /// 模型和标签文件所在目录
    pub models_dir: PathBuf,

    /// 模型文件名，相对于 `models_dir`
    pub model_file: String,

    /// 标签文件名，相对于 `models_dir`
    pub labels_file: String,

    /// 开发模式
    pub dev_mode: bool,

    /// "<label> (<pct>%)" 输出中的小数位数
    pub display_precision: usize,

    pub onnx_config: OnnxConfig,

    pub preprocess_config: PreprocessConfig,

    pub server_config: ServerConfig,
}

#[derive(Debug, Clone)]
pub struct OnnxConfig {
    /// 算子内 CPU 线程数
    pub intra_threads: usize,

    /// 图优化级别，0（关闭）到 3（全部）
    pub optimization_level: u8,
}

#[derive(Debug, Clone)]
pub struct PreprocessConfig {
    pub width: u32,
    pub height: u32,
    pub filter: ResizeFilter,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_INPUT_SIZE,
            height: DEFAULT_INPUT_SIZE,
            filter: ResizeFilter::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// 请求超时（秒）
    pub request_timeout: u64,

    /// 解码前的最大图像大小（字节）
    pub max_request_size: usize,

    /// 最大并发请求数
    pub max_concurrent_requests: usize,
}

impl ServerConfig {
    /// 请求体上限：base64 编码使体积增大约 4/3，另留 64KB 给 JSON/multipart 包装
    pub fn max_body_size(&self) -> usize {
        self.max_request_size / 3 * 4 + 4 + 64 * 1024
    }
}

impl Config {
    pub fn new(
        bind_addr: String,
        models_dir: String,
        threads: Option<usize>,
        dev_mode: bool,
    ) -> Result<Self> {
        let cpu_cores = num_cpus::get();

        let onnx_config = OnnxConfig {
            intra_threads: threads.unwrap_or((cpu_cores * 3 / 4).max(1)),
            optimization_level: 3,
        };

        let server_config = ServerConfig {
            request_timeout: if dev_mode { 300 } else { 30 },
            max_request_size: crate::image::loader::MAX_IMAGE_BYTES,
            max_concurrent_requests: if dev_mode { 10 } else { 1000 },
        };

        let config = Self {
            bind_addr,
            models_dir: PathBuf::from(models_dir),
            model_file: "model.onnx".to_string(),
            labels_file: "labels.txt".to_string(),
            dev_mode,
            display_precision: DEFAULT_DISPLAY_PRECISION,
            onnx_config,
            preprocess_config: PreprocessConfig::default(),
            server_config,
        };
        config.validate()?;

        Ok(config)
    }

    pub fn with_model_file(mut self, model_file: impl Into<String>) -> Self {
        self.model_file = model_file.into();
        self
    }

    pub fn with_labels_file(mut self, labels_file: impl Into<String>) -> Self {
        self.labels_file = labels_file.into();
        self
    }

    pub fn with_input_size(mut self, width: u32, height: u32) -> Self {
        self.preprocess_config.width = width;
        self.preprocess_config.height = height;
        self
    }

    pub fn with_filter(mut self, filter: ResizeFilter) -> Self {
        self.preprocess_config.filter = filter;
        self
    }

    pub fn with_display_precision(mut self, precision: usize) -> Self {
        self.display_precision = precision;
        self
    }

    pub fn validate(&self) -> Result<()> {
        let PreprocessConfig { width, height, .. } = self.preprocess_config;
        if width == 0 || height == 0 {
            return Err(ClassifyError::Config(format!(
                "Input size must be positive, got {}x{}",
                width, height
            )));
        }
        if self.onnx_config.optimization_level > 3 {
            return Err(ClassifyError::Config(format!(
                "Optimization level must be 0-3, got {}",
                self.onnx_config.optimization_level
            )));
        }
        if self.onnx_config.intra_threads == 0 {
            return Err(ClassifyError::Config("Thread count must be at least 1".to_string()));
        }
        if self.display_precision > ClassifyOptions::MAX_PRECISION {
            return Err(ClassifyError::Config(format!(
                "Display precision must be at most {}, got {}",
                ClassifyOptions::MAX_PRECISION,
                self.display_precision
            )));
        }
        if self.server_config.max_concurrent_requests == 0 {
            return Err(ClassifyError::Config(
                "Concurrent request limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// 模型文件路径
    pub fn model_path(&self) -> PathBuf {
        self.models_dir.join(&self.model_file)
    }

    /// 标签文件路径
    pub fn labels_path(&self) -> PathBuf {
        self.models_dir.join(&self.labels_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_mobilenet_input() {
        let config = Config::new("127.0.0.1:5005".into(), "assets".into(), Some(2), false).unwrap();
        assert_eq!(config.preprocess_config.width, 224);
        assert_eq!(config.preprocess_config.height, 224);
        assert_eq!(config.preprocess_config.filter, ResizeFilter::Bilinear);
        assert_eq!(config.onnx_config.intra_threads, 2);
        assert_eq!(config.model_path(), PathBuf::from("assets/model.onnx"));
        assert_eq!(config.labels_path(), PathBuf::from("assets/labels.txt"));
    }

    #[test]
    fn zero_input_size_is_rejected() {
        let config = Config::new("127.0.0.1:5005".into(), "assets".into(), None, false)
            .unwrap()
            .with_input_size(0, 224);
        assert!(matches!(config.validate(), Err(ClassifyError::Config(_))));
    }

    #[test]
    fn zero_threads_is_rejected() {
        let result = Config::new("127.0.0.1:5005".into(), "assets".into(), Some(0), false);
        assert!(matches!(result, Err(ClassifyError::Config(_))));
    }

    #[test]
    fn excessive_display_precision_is_rejected() {
        let config = Config::new("127.0.0.1:5005".into(), "assets".into(), None, false).unwrap();
        assert!(config.clone().with_display_precision(ClassifyOptions::MAX_PRECISION).validate().is_ok());

        let result = config.with_display_precision(ClassifyOptions::MAX_PRECISION + 1).validate();
        assert!(matches!(result, Err(ClassifyError::Config(_))));
    }

    #[test]
    fn body_limit_fits_base64_of_largest_image() {
        let config = Config::new("127.0.0.1:5005".into(), "assets".into(), None, false).unwrap();
        let server = &config.server_config;
        let encoded_len = (server.max_request_size + 2) / 3 * 4;
        assert!(server.max_body_size() > encoded_len);
    }

    #[test]
    fn dev_mode_limits_concurrency() {
        let dev = Config::new("127.0.0.1:5005".into(), "assets".into(), None, true).unwrap();
        let prod = Config::new("127.0.0.1:5005".into(), "assets".into(), None, false).unwrap();
        assert_eq!(dev.server_config.max_concurrent_requests, 10);
        assert_eq!(prod.server_config.max_concurrent_requests, 1000);
        assert!(dev.server_config.request_timeout > prod.server_config.request_timeout);
    }
}
