//! Input validation utilities

use std::sync::LazyLock;

use regex::Regex;

use crate::constants;

static UNSAFE_FILE_NAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[\x00-\x1f\x7f"\\]"#).expect("valid regex"));

/// Validate a storage object path requested through the download proxy
///
/// Only the raw string is inspected: any `..` or a leading `/` is rejected.
pub fn validate_file_path(file_path: Option<&str>) -> Result<&str, &'static str> {
    let path = match file_path {
        Some(p) if !p.is_empty() => p,
        _ => return Err("Missing filePath parameter"),
    };

    if path.contains("..") || path.starts_with('/') {
        return Err("Invalid file path");
    }

    Ok(path)
}

/// Name offered in the `Content-Disposition` header
///
/// Falls back to the last path segment, then to `file`.
pub fn attachment_file_name(file_path: &str, file_name: Option<&str>) -> String {
    let name = file_name
        .filter(|n| !n.is_empty())
        .or_else(|| file_path.rsplit('/').next().filter(|s| !s.is_empty()))
        .unwrap_or("file");

    UNSAFE_FILE_NAME_CHARS.replace_all(name, "_").into_owned()
}

/// Validate user role
pub fn validate_role(role: &str) -> Result<(), &'static str> {
    if constants::roles::ALL.contains(&role) {
        Ok(())
    } else {
        Err("Invalid role")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_file_path() {
        assert_eq!(validate_file_path(Some("assets/a/b.zip")), Ok("assets/a/b.zip"));
        assert_eq!(validate_file_path(None), Err("Missing filePath parameter"));
        assert_eq!(validate_file_path(Some("")), Err("Missing filePath parameter"));
        assert_eq!(validate_file_path(Some("../secret")), Err("Invalid file path"));
        assert_eq!(validate_file_path(Some("assets/../x")), Err("Invalid file path"));
        assert_eq!(validate_file_path(Some("/etc/passwd")), Err("Invalid file path"));
    }

    #[test]
    fn test_attachment_file_name() {
        assert_eq!(attachment_file_name("assets/a/model.fbx", None), "model.fbx");
        assert_eq!(attachment_file_name("assets/a/model.fbx", Some("My Model.fbx")), "My Model.fbx");
        assert_eq!(attachment_file_name("assets/a/", None), "file");
        assert_eq!(attachment_file_name("x", Some("bad\"name")), "bad_name");
    }

    #[test]
    fn test_validate_role() {
        assert!(validate_role("admin").is_ok());
        assert!(validate_role("member").is_ok());
        assert!(validate_role("superuser").is_err());
    }
}
