use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Separator joining path segments into the canonical key.
/// 路徑片段之間的固定分隔字元。
pub const SEPARATOR: char = '/';

/// Default suffix trimmed from display names.
/// 顯示名稱時預設去除的副檔名。
pub const DEFAULT_EXTENSION: &str = ".json";

/// Namespace-relative identity of one saved workflow.
/// 已儲存工作流程在命名空間內的路徑識別。
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkflowPath {
    segments: Vec<String>,
}

impl WorkflowPath {
    /// Builds a path from segments, rejecting empty sequences and empty segments.
    /// 由片段建立路徑；空序列或空片段會被拒絕。
    pub fn from_segments<I, S>(segments: I) -> Result<Self, PathError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() {
            return Err(PathError::Empty);
        }
        for (index, segment) in segments.iter().enumerate() {
            if segment.is_empty() {
                return Err(PathError::EmptySegment {
                    path: join_segments(&segments),
                    index,
                });
            }
            if segment.contains(SEPARATOR) {
                return Err(PathError::SeparatorInSegment(segment.clone()));
            }
        }
        Ok(Self { segments })
    }

    /// Parses the canonical `a/b/c.json` form.
    /// 解析正規化的 `a/b/c.json` 字串。
    ///
    /// Segments are taken verbatim, so a parsed path always equals the one
    /// built from the same segments by a listing.
    pub fn parse(text: &str) -> Result<Self, PathError> {
        if text.is_empty() {
            return Err(PathError::Empty);
        }
        Self::from_segments(text.split(SEPARATOR))
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Last segment, i.e. the file name of the leaf.
    /// 最後一個片段（檔名）。
    pub fn file_name(&self) -> &str {
        self.segments
            .last()
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// Canonical key: segments joined by [`SEPARATOR`].
    /// 以分隔字元串接的正規化字串。
    pub fn as_key(&self) -> String {
        join_segments(&self.segments)
    }

    /// Every proper prefix, shortest first.
    /// 所有真前綴，由短至長。
    pub fn prefixes(&self) -> impl Iterator<Item = &[String]> {
        (1..self.segments.len()).map(move |end| &self.segments[..end])
    }

    /// Full path with `extension` trimmed from the end.
    /// 去除副檔名後的完整路徑。
    pub fn display_name(&self, extension: &str) -> String {
        trim_extension(&self.as_key(), extension).to_string()
    }

    /// Returns a copy whose file name ends with `extension`.
    pub fn with_extension(&self, extension: &str) -> Self {
        if extension.is_empty() || self.file_name().to_lowercase().ends_with(&extension.to_lowercase()) {
            return self.clone();
        }
        let mut segments = self.segments.clone();
        if let Some(last) = segments.last_mut() {
            last.push_str(extension);
        }
        Self { segments }
    }
}

/// Joins raw segments with [`SEPARATOR`].
pub(crate) fn join_segments(segments: &[String]) -> String {
    let mut buf = [0u8; 4];
    segments.join(&*SEPARATOR.encode_utf8(&mut buf))
}

/// Removes a trailing `extension` from `name` when present.
/// 若名稱以副檔名結尾則將其移除。
pub fn trim_extension<'a>(name: &'a str, extension: &str) -> &'a str {
    if extension.is_empty() {
        return name;
    }
    name.strip_suffix(extension).unwrap_or(name)
}

impl fmt::Display for WorkflowPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_key())
    }
}

impl FromStr for WorkflowPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for WorkflowPath {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.as_key())
    }
}

impl<'de> Deserialize<'de> for WorkflowPath {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}

/// Errors raised while building a [`WorkflowPath`].
/// 建立工作流程路徑時的錯誤。
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("workflow path is empty")]
    Empty,
    #[error("workflow path {path:?} has an empty segment at position {index}")]
    EmptySegment { path: String, index: usize },
    #[error("segment {0:?} contains the path separator")]
    SeparatorInSegment(String),
}
