//! Canonical paths and virtual import specifiers

use path_clean::PathClean;
use std::path::{Component, Path, PathBuf};

/// Path of `path` relative to `root`, `/`-separated.
///
/// Files outside the root get leading `..` segments. Both paths are cleaned
/// lexically first; nothing touches the filesystem.
pub fn relative_url(root: &Path, path: &Path) -> String {
    let root = root.clean();
    let path = if path.is_absolute() {
        path.clean()
    } else {
        root.join(path).clean()
    };

    let root_parts: Vec<Component<'_>> = root.components().collect();
    let path_parts: Vec<Component<'_>> = path.components().collect();

    let common = root_parts
        .iter()
        .zip(path_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut segments: Vec<String> = Vec::new();
    for _ in common..root_parts.len() {
        segments.push("..".to_string());
    }
    for part in &path_parts[common..] {
        segments.push(part.as_os_str().to_string_lossy().into_owned());
    }

    segments.join("/")
}

/// Escape `value` the way a JSON string body would be, without quotes.
pub fn escape_specifier(value: &str) -> String {
    let quoted = serde_json::Value::String(value.to_string()).to_string();
    quoted[1..quoted.len() - 1].to_string()
}

/// Inverse of a virtual path's path part: strip the root marker, undo the
/// JSON escaping and resolve against `root`.
pub fn resolve_virtual(root: &Path, virtual_path: &str) -> PathBuf {
    let relative = virtual_path.strip_prefix('/').unwrap_or(virtual_path);
    let relative = serde_json::from_str::<String>(&format!("\"{}\"", relative))
        .unwrap_or_else(|_| relative.to_string());
    root.join(relative).clean()
}

/// Resolve a root-relative dependency path (optionally `/`-prefixed)
/// against `root`. Unlike [`resolve_virtual`] the path is taken verbatim.
pub fn resolve_relative(root: &Path, relative: &str) -> PathBuf {
    let relative = relative.strip_prefix('/').unwrap_or(relative);
    root.join(relative).clean()
}

/// Split an id into its path and optional query string.
pub fn split_query(id: &str) -> (&str, Option<&str>) {
    match id.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (id, None),
    }
}
