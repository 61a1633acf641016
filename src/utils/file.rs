use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Context, Result};

/// Replace `path` with `contents` by writing a sibling temp file and renaming it over the target.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
    }

    let tmp = temp_sibling(path);
    fs::write(&tmp, contents)
        .with_context(|| format!("Failed to write temporary file {}", tmp.display()))?;

    if let Err(err) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(err.into());
    }
    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_existing_contents() {
        let dir = std::env::temp_dir().join(format!("stock-watch-file-{}", std::process::id()));
        let path = dir.join("nested").join("data.json");

        write_atomic(&path, b"[1]").expect("first write");
        write_atomic(&path, b"[2]").expect("second write");

        assert_eq!(fs::read_to_string(&path).unwrap(), "[2]");
        assert!(!temp_sibling(&path).exists());
        let _ = fs::remove_dir_all(dir);
    }
}
