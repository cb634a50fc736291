//! Request-path validation
//!
//! Every request target passes through [`validate`] before any backend
//! access; a rejected path never reaches the object store.

use std::fmt;

use percent_encoding::percent_decode_str;

/// Why a request path was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathError {
    /// A `..` segment tried to escape the store root
    Traversal,
    /// A leading `-` would read as a flag on the backend command line
    ArgumentInjection,
    /// An embedded NUL byte
    NullByte,
    /// The decoded target was not valid UTF-8
    Encoding,
}

impl fmt::Display for PathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathError::Traversal => write!(f, "path traversal"),
            PathError::ArgumentInjection => write!(f, "argument injection"),
            PathError::NullByte => write!(f, "null byte"),
            PathError::Encoding => write!(f, "invalid encoding"),
        }
    }
}

impl std::error::Error for PathError {}

/// Validate a raw request target into a safe relative path
///
/// Drops any query string, percent-decodes, strips a single leading `/`,
/// then rejects:
/// - whole `..` segments at any depth (`/` and `\` both count as
///   separators, since the remote may treat either as meaningful),
/// - a leading `-`, which the backend CLI would parse as a flag,
/// - NUL bytes.
///
/// Names merely containing `..` (like `a..b.mp4`) are fine. The empty
/// string is the store root and is valid.
pub fn validate(raw_target: &str) -> Result<String, PathError> {
    let without_query = raw_target.split('?').next().unwrap_or(raw_target);

    let decoded = percent_decode_str(without_query)
        .decode_utf8()
        .map_err(|_| PathError::Encoding)?;

    let path = decoded.strip_prefix('/').unwrap_or(&decoded);

    if path.split(['/', '\\']).any(|segment| segment == "..") {
        return Err(PathError::Traversal);
    }

    if path.starts_with('-') {
        return Err(PathError::ArgumentInjection);
    }

    if path.contains('\0') {
        return Err(PathError::NullByte);
    }

    Ok(path.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_paths_pass_through() {
        assert_eq!(validate("/movies/action.mp4").unwrap(), "movies/action.mp4");
        assert_eq!(validate("/movies/").unwrap(), "movies/");
        assert_eq!(validate("movies").unwrap(), "movies");
    }

    #[test]
    fn test_root_paths() {
        assert_eq!(validate("/").unwrap(), "");
        assert_eq!(validate("").unwrap(), "");
    }

    #[test]
    fn test_only_one_leading_slash_stripped() {
        assert_eq!(validate("//shared/x").unwrap(), "/shared/x");
    }

    #[test]
    fn test_query_string_ignored() {
        assert_eq!(validate("/movie.mp4?t=30").unwrap(), "movie.mp4");
        assert_eq!(validate("/?list=1").unwrap(), "");
    }

    #[test]
    fn test_traversal_any_position() {
        assert!(matches!(validate("/../etc/passwd"), Err(PathError::Traversal)));
        assert!(matches!(validate("/../../etc/passwd"), Err(PathError::Traversal)));
        assert!(matches!(validate("/a/../b"), Err(PathError::Traversal)));
        assert!(matches!(validate("/a/b/.."), Err(PathError::Traversal)));
        assert!(matches!(validate(".."), Err(PathError::Traversal)));
    }

    #[test]
    fn test_traversal_backslash_separators() {
        assert!(matches!(validate("/a\\..\\b"), Err(PathError::Traversal)));
        assert!(matches!(validate("/..\\x"), Err(PathError::Traversal)));
    }

    #[test]
    fn test_traversal_percent_encoded() {
        assert!(matches!(validate("/%2e%2e/etc"), Err(PathError::Traversal)));
        assert!(matches!(validate("/%2E%2E/etc"), Err(PathError::Traversal)));
        assert!(matches!(validate("/a%2f..%2fb"), Err(PathError::Traversal)));
    }

    #[test]
    fn test_internal_dots_are_not_traversal() {
        assert_eq!(validate("/a..b.mp4").unwrap(), "a..b.mp4");
        assert_eq!(validate("/movies/...trailer.mkv").unwrap(), "movies/...trailer.mkv");
    }

    #[test]
    fn test_leading_dash_rejected() {
        assert!(matches!(validate("/-flag"), Err(PathError::ArgumentInjection)));
        assert!(matches!(validate("/--config=x"), Err(PathError::ArgumentInjection)));
        assert!(matches!(validate("/%2dflag"), Err(PathError::ArgumentInjection)));
    }

    #[test]
    fn test_dash_inside_path_is_fine() {
        assert_eq!(validate("/a-b/c-d.mp4").unwrap(), "a-b/c-d.mp4");
        assert_eq!(validate("/x/-not-a-flag").unwrap(), "x/-not-a-flag");
    }

    #[test]
    fn test_nul_byte_rejected() {
        assert!(matches!(validate("/a%00b"), Err(PathError::NullByte)));
        assert!(matches!(validate("/movie.mp4%00.txt"), Err(PathError::NullByte)));
    }

    #[test]
    fn test_invalid_utf8_rejected() {
        assert!(matches!(validate("/%ff%fe"), Err(PathError::Encoding)));
    }

    #[test]
    fn test_unicode_names_survive_decoding() {
        assert_eq!(validate("/caf%C3%A9/film.mp4").unwrap(), "café/film.mp4");
    }

    #[test]
    fn test_traversal_checked_before_dash_rule() {
        assert!(matches!(validate("/../-x"), Err(PathError::Traversal)));
    }
}
