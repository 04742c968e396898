//! Helper utility functions

use std::path::{Component, Path, PathBuf};

/// Check that a declared entry is a plain relative path that stays inside its root
pub fn is_contained_relative(s: &str) -> bool {
    let path = Path::new(s);
    !s.is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
        && path.components().any(|c| matches!(c, Component::Normal(_)))
}

/// Drop `.` components so `./icons` and `icons` compare equal
pub fn without_cur_dir(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

/// Check that a string names a single file with no directory part
pub fn is_plain_file_name(s: &str) -> bool {
    let mut components = Path::new(s).components();
    matches!(components.next(), Some(Component::Normal(_))) && components.next().is_none()
}

/// Archive entry name for a relative path; always `/`-separated
pub fn archive_entry_name(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Human-readable byte count
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];

    if bytes < 1024 {
        return format!("{} bytes", bytes);
    }

    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use test_case::test_case;

    #[test_case("manifest.json", true)]
    #[test_case("src", true)]
    #[test_case("./icons", true)]
    #[test_case("src/popup", true)]
    #[test_case("", false)]
    #[test_case(".", false)]
    #[test_case("../secrets", false)]
    #[test_case("src/../../x", false)]
    #[test_case("/etc/passwd", false)]
    fn test_is_contained_relative(input: &str, expected: bool) {
        assert_eq!(is_contained_relative(input), expected);
    }

    #[test_case("./extension.zip", "extension.zip")]
    #[test_case("src/./popup", "src/popup")]
    #[test_case("icons", "icons")]
    fn test_without_cur_dir(input: &str, expected: &str) {
        assert_eq!(without_cur_dir(Path::new(input)), PathBuf::from(expected));
    }

    #[test_case("extension.zip", true)]
    #[test_case("dist/extension.zip", false)]
    #[test_case("..", false)]
    #[test_case("", false)]
    fn test_is_plain_file_name(input: &str, expected: bool) {
        assert_eq!(is_plain_file_name(input), expected);
    }

    #[test]
    fn test_archive_entry_name_uses_forward_slashes() {
        let path: PathBuf = ["src", "popup", "popup.html"].iter().collect();
        assert_eq!(archive_entry_name(&path), "src/popup/popup.html");
    }

    #[test_case(0, "0 bytes")]
    #[test_case(1023, "1023 bytes")]
    #[test_case(1536, "1.5 KiB")]
    #[test_case(5 * 1024 * 1024, "5.0 MiB")]
    fn test_format_bytes(bytes: u64, expected: &str) {
        assert_eq!(format_bytes(bytes), expected);
    }
}
