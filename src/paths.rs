use std::path::{Path, PathBuf};

fn is_windows_drive(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() >= 2 && bytes[1] == b':' && bytes[0].is_ascii_alphabetic()
}

// Lightweight path display wrapper that renders with forward slashes.
// Avoids allocating strings until actually formatted for logs.
pub(crate) struct DisplayPath<'a>(pub(crate) &'a Path);

impl std::fmt::Display for DisplayPath<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = self.0.to_string_lossy();
        f.write_str(&normalize_separators(&s))
    }
}

pub(crate) fn display_path(p: &Path) -> DisplayPath<'_> {
    DisplayPath(p)
}

/// Convert backslashes to forward slashes and collapse repeated slashes.
/// No dot-segment resolution happens here.
pub fn normalize_separators(p: &str) -> String {
    let mut s = p.replace('\\', "/");
    while s.contains("//") {
        s = s.replace("//", "/");
    }
    s
}

/// Normalize a manifest-supplied destination into a relative path that stays
/// under the output root.
///
/// - backslashes become separators, repeated separators collapse
/// - `.` segments are dropped and `..` pops the previous segment
/// - absolute paths, drive/UNC prefixes, empty results and any `..` that would
///   climb above the root are rejected with a short reason
pub fn normalize_relative(raw: &str) -> Result<PathBuf, String> {
    if raw.trim().is_empty() {
        return Err("empty path".to_string());
    }
    if is_windows_drive(raw) {
        return Err("drive-qualified path".to_string());
    }
    let unified = raw.replace('\\', "/");
    if unified.starts_with('/') {
        return Err("absolute path".to_string());
    }
    let mut segments: Vec<&str> = Vec::new();
    for seg in unified.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err("escapes the output root".to_string());
                }
            }
            s => segments.push(s),
        }
    }
    if segments.is_empty() {
        return Err("no file name".to_string());
    }
    Ok(segments.iter().collect())
}

/// Temporary sibling used while a fetch is in flight; renamed into place on success.
pub fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}
