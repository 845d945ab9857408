use crate::utils::error::ClassifyError;
use crate::Result;
use std::fs;
use std::path::Path;

/// 按模型输出位置索引的类别名称
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSet {
    labels: Vec<String>,
}

impl LabelSet {
    pub fn new(labels: Vec<String>) -> Self {
        Self { labels }
    }

    /// 每行一个标签，行尾可以是 `\n`、`\r\n` 或单独的 `\r`。
    /// 行内容原样保留（包括空行），行号即类别索引。
    pub fn parse(content: &str) -> Self {
        let mut labels = Vec::new();
        let mut rest = content;

        while !rest.is_empty() {
            match rest.find(|c: char| c == '\r' || c == '\n') {
                Some(end) => {
                    labels.push(rest[..end].to_string());
                    let terminator = if rest[end..].starts_with("\r\n") { 2 } else { 1 };
                    rest = &rest[end + terminator..];
                }
                None => {
                    labels.push(rest.to_string());
                    break;
                }
            }
        }

        Self { labels }
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ClassifyError::AssetLoad(format!(
                "Labels file not found: {}",
                path.display()
            )));
        }

        tracing::info!("Loading labels from: {}", path.display());

        let bytes = fs::read(path).map_err(|e| {
            ClassifyError::AssetLoad(format!("Failed to read labels {}: {}", path.display(), e))
        })?;

        // 非UTF-8字节替换为U+FFFD，保持行数不变
        let content = String::from_utf8_lossy(&bytes);
        let labels = Self::parse(&content);
        tracing::info!("Loaded {} labels", labels.len());
        tracing::debug!("First labels: {:?}", labels.iter().take(5).collect::<Vec<_>>());

        Ok(labels)
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for LabelSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parse_keeps_order_and_blank_lines() {
        let labels = LabelSet::parse("background\ntench\n\ngoldfish\n");
        assert_eq!(labels.len(), 4);
        assert_eq!(labels.get(0), Some("background"));
        assert_eq!(labels.get(2), Some(""));
        assert_eq!(labels.get(3), Some("goldfish"));
        assert_eq!(labels.get(4), None);
    }

    #[test]
    fn parse_handles_crlf_and_missing_final_newline() {
        let labels = LabelSet::parse("cat\r\ndog\r\nbird");
        assert_eq!(labels.iter().collect::<Vec<_>>(), vec!["cat", "dog", "bird"]);
    }

    #[test]
    fn parse_splits_on_lone_carriage_return() {
        let labels = LabelSet::parse("cat\rdog\rbird\r");
        assert_eq!(labels.len(), 3);
        assert_eq!(labels.iter().collect::<Vec<_>>(), vec!["cat", "dog", "bird"]);
    }

    #[test]
    fn parse_mixes_line_endings() {
        let labels = LabelSet::parse("a\r\nb\rc\n\r\nd");
        assert_eq!(labels.iter().collect::<Vec<_>>(), vec!["a", "b", "c", "", "d"]);
    }

    #[test]
    fn parse_empty_content_has_no_labels() {
        assert!(LabelSet::parse("").is_empty());
        assert_eq!(LabelSet::parse("\n").iter().collect::<Vec<_>>(), vec![""]);
    }

    #[test]
    fn load_keeps_lines_with_invalid_utf8() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"tench\ngold\xfffish\nshark\n").unwrap();

        let labels = LabelSet::load(file.path()).unwrap();
        assert_eq!(labels.len(), 3);
        assert_eq!(labels.get(1), Some("gold\u{FFFD}fish"));
        assert_eq!(labels.get(2), Some("shark"));
    }

    #[test]
    fn parse_does_not_trim_labels() {
        let labels = LabelSet::parse(" great white shark \n");
        assert_eq!(labels.get(0), Some(" great white shark "));
    }

    #[test]
    fn load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "cat").unwrap();
        writeln!(file, "dog").unwrap();

        let labels = LabelSet::load(file.path()).unwrap();
        assert_eq!(labels, LabelSet::from_iter(["cat", "dog"]));
    }

    #[test]
    fn load_missing_file_is_asset_failure() {
        let dir = tempfile::tempdir().unwrap();
        let result = LabelSet::load(&dir.path().join("labels.txt"));
        assert!(matches!(result, Err(ClassifyError::AssetLoad(_))));
    }
}
