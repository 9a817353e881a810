//! Input validation: reject unusable source paths before pdfium sees them.
//!
//! pdfium reports a missing file, a permission problem and a truncated PDF
//! with the same opaque "format error". Checking existence, readability and
//! the `%PDF` magic bytes first gives each skipped input a reason a user can
//! act on.

use crate::error::SourceError;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Validate that `path` is an existing, readable file starting with `%PDF`.
pub fn validate_source(path: &Path) -> Result<(), SourceError> {
    let unreadable = |detail: String| SourceError::UnreadableSource {
        path: path.to_path_buf(),
        detail,
    };

    if !path.exists() {
        return Err(unreadable("file not found".into()));
    }
    if path.is_dir() {
        return Err(unreadable("is a directory".into()));
    }

    match std::fs::File::open(path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            match f.read_exact(&mut magic) {
                Ok(()) if &magic == b"%PDF" => {}
                Ok(()) => {
                    return Err(unreadable(format!(
                        "not a PDF (first bytes {magic:?})"
                    )))
                }
                Err(_) => return Err(unreadable("file is too short to be a PDF".into())),
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(unreadable("permission denied".into()));
        }
        Err(e) => return Err(unreadable(e.to_string())),
    }

    debug!("Validated source PDF: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_is_unreadable() {
        let err = validate_source(Path::new("/definitely/not/here.pdf")).unwrap_err();
        match err {
            SourceError::UnreadableSource { detail, .. } => assert!(detail.contains("not found")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn wrong_magic_is_unreadable() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"PK\x03\x04 zip archive").unwrap();
        let err = validate_source(f.path()).unwrap_err();
        assert_eq!(err.kind(), "unreadable_source");
        assert!(err.to_string().contains("not a PDF"));
    }

    #[test]
    fn short_file_is_unreadable() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"%P").unwrap();
        assert!(validate_source(f.path()).is_err());
    }

    #[test]
    fn directory_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        assert!(validate_source(dir.path()).is_err());
    }

    #[test]
    fn pdf_magic_passes() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"%PDF-1.7\n%\xE2\xE3\xCF\xD3\n").unwrap();
        assert!(validate_source(f.path()).is_ok());
    }
}
