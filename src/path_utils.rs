//! Asset path validation and normalization against a layer

use std::path::{Component, Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::stage::Layer;

/// Characters that can't appear in a portable file path
static ILLEGAL_CHARACTERS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[<>"|?*\x00-\x1F]"#).expect("illegal character pattern is valid"));

/// Use forward slashes and drop `.`/`..` segments without touching the disk
pub fn normalize_path(path: &str) -> String {
    let path = path.replace('\\', "/");
    if path.contains("://") {
        return path;
    }
    let mut normalized = PathBuf::new();
    for component in Path::new(&path).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let ends_with_parent = matches!(normalized.components().next_back(), Some(Component::ParentDir));
                if ends_with_parent || !normalized.pop() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized.display().to_string().replace('\\', "/")
}

/// A path is valid when it's well-formed and points to an existing file,
/// resolving relative paths against the layer
pub fn is_file_path_valid(path: &str, layer: &Layer) -> bool {
    let path = path.trim();
    if path.is_empty() || ILLEGAL_CHARACTERS.is_match(path) {
        return false;
    }
    let absolute = layer.compute_absolute_path(path);
    if absolute.contains("://") {
        // Remote assets can't be checked locally
        return true;
    }
    Path::new(&absolute).is_file()
}

/// Express a path relative to the layer's directory when it lives below it
pub fn make_relative_to_layer(path: &str, layer: &Layer) -> String {
    let normalized = normalize_path(path);
    let Some(directory) = layer.directory() else {
        return normalized;
    };
    let directory = normalize_path(&directory.display().to_string());
    match Path::new(&normalized).strip_prefix(&directory) {
        Ok(relative) => format!("./{}", relative.display()).replace('\\', "/"),
        Err(_) => normalized,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path(r"textures\wood.png"), "textures/wood.png");
        assert_eq!(normalize_path("/a/./b/../c.png"), "/a/c.png");
        assert_eq!(normalize_path("../c.png"), "../c.png");
        assert_eq!(normalize_path("../../c.png"), "../../c.png");
        assert_eq!(normalize_path("omniverse://host/a\\b.png"), "omniverse://host/a/b.png");
    }

    #[test]
    fn test_file_path_validation() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("textures")).unwrap();
        std::fs::write(dir.path().join("textures").join("wood.png"), b"png").unwrap();
        let layer = Layer::from_file(dir.path().join("scene.usda"));

        assert!(is_file_path_valid("textures/wood.png", &layer));
        assert!(is_file_path_valid("  textures/wood.png ", &layer));
        assert!(!is_file_path_valid("textures/missing.png", &layer));
        assert!(!is_file_path_valid("textures/wo?d.png", &layer));
        assert!(!is_file_path_valid("", &layer));
        assert!(!is_file_path_valid("textures", &layer));
    }

    #[test]
    fn test_make_relative_to_layer() {
        let layer = Layer::from_file("/project/scene.usda");
        assert_eq!(make_relative_to_layer("/project/textures/a.png", &layer), "./textures/a.png");
        assert_eq!(make_relative_to_layer("/elsewhere/a.png", &layer), "/elsewhere/a.png");
        assert_eq!(make_relative_to_layer("/x/a.png", &Layer::anonymous("anon")), "/x/a.png");
    }
}
