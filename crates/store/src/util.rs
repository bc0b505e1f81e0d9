use std::fs;
use std::io::{self, Write};
use std::path::Path;

use tempfile::Builder;

/// Suffix of in-flight writes; such names are never workflows.
pub const TMP_SUFFIX: &str = ".tmp";

/// Replaces `path` in one step: the bytes land in a uniquely named
/// `.<random>.tmp` sibling first and are renamed over the target, so readers
/// never see a half-written file.
/// 先寫入唯一命名的暫存檔再改名覆蓋，讀取端不會看到寫一半的檔案。
pub fn write_atomic(path: &Path, data: &[u8]) -> io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;
    let mut staging = Builder::new()
        .prefix(".")
        .suffix(TMP_SUFFIX)
        .tempfile_in(parent)?;
    staging.write_all(data)?;
    staging.persist(path).map_err(|err| err.error)?;
    Ok(())
}
