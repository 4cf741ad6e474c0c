use crate::config::UploadPolicy;
use crate::error::ValidationError;
use crate::upload::types::FileCandidate;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::Path;

const ANY_EXTENSION: &str = "*";

/// Decides whether a path may be uploaded. Reads filesystem metadata only.
#[derive(Debug, Clone)]
pub struct FileValidator {
    allowed_extensions: HashSet<String>,
    allow_any_extension: bool,
    max_file_size: u64,
}

impl FileValidator {
    pub fn new(policy: &UploadPolicy) -> Self {
        let allowed_extensions: HashSet<String> = policy
            .allowed_extensions
            .iter()
            .map(|ext| Self::normalize_extension(ext))
            .collect();
        let allow_any_extension = allowed_extensions.contains(ANY_EXTENSION);

        Self {
            allowed_extensions,
            allow_any_extension,
            max_file_size: policy.max_file_size,
        }
    }

    /// The size ceiling is checked before the extension so an oversized file
    /// is always reported as `TooLarge`.
    pub fn validate(&self, path: &Path) -> Result<FileCandidate, ValidationError> {
        let metadata = match fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ValidationError::NotFound)
            }
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "metadata lookup failed");
                return Err(ValidationError::NotFound);
            }
        };

        if !metadata.is_file() {
            return Err(ValidationError::NotAFile);
        }

        let size = metadata.len();
        if size > self.max_file_size {
            return Err(ValidationError::TooLarge {
                size,
                limit: self.max_file_size,
            });
        }

        let candidate = FileCandidate::new(path, size);
        if !self.is_allowed_extension(candidate.extension()) {
            return Err(ValidationError::DisallowedExtension {
                extension: candidate.extension().to_string(),
            });
        }

        Ok(candidate)
    }

    pub fn is_allowed_extension(&self, extension: &str) -> bool {
        self.allow_any_extension
            || (!extension.is_empty()
                && self
                    .allowed_extensions
                    .contains(&Self::normalize_extension(extension)))
    }

    fn normalize_extension(ext: &str) -> String {
        ext.trim().trim_start_matches('.').to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;

    fn policy(extensions: &[&str], max_file_size: u64) -> UploadPolicy {
        UploadPolicy {
            allowed_extensions: extensions.iter().map(|e| e.to_string()).collect(),
            max_file_size,
            ..UploadPolicy::default()
        }
    }

    #[test]
    fn accepts_allowed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        fs::write(&path, b"hello").unwrap();

        let validator = FileValidator::new(&policy(&["txt"], 1024));
        let candidate = validator.validate(&path).unwrap();
        assert_eq!(candidate.size(), 5);
        assert_eq!(candidate.path(), path.as_path());
    }

    #[test]
    fn extension_check_is_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("PHOTO.JpG");
        fs::write(&path, b"x").unwrap();

        let validator = FileValidator::new(&policy(&[".jpg"], 1024));
        assert!(validator.validate(&path).is_ok());
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let validator = FileValidator::new(&policy(&["txt"], 1024));
        assert_eq!(
            validator.validate(&dir.path().join("gone.txt")),
            Err(ValidationError::NotFound)
        );
    }

    #[test]
    fn directory_is_not_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let validator = FileValidator::new(&policy(&["*"], 1024));
        assert_eq!(
            validator.validate(dir.path()),
            Err(ValidationError::NotAFile)
        );
    }

    #[test]
    fn disallowed_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("setup.exe");
        fs::write(&path, b"MZ").unwrap();

        let validator = FileValidator::new(&policy(&["txt"], 1024));
        assert_eq!(
            validator.validate(&path),
            Err(ValidationError::DisallowedExtension {
                extension: "exe".into()
            })
        );
    }

    #[test]
    fn file_without_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("README");
        fs::write(&path, b"read me").unwrap();

        let validator = FileValidator::new(&policy(&["txt"], 1024));
        assert_eq!(
            validator.validate(&path),
            Err(ValidationError::DisallowedExtension {
                extension: String::new()
            })
        );
    }

    #[test]
    fn oversized_file_is_too_large_regardless_of_extension() {
        let dir = tempfile::tempdir().unwrap();
        let allowed = dir.path().join("big.txt");
        let disallowed = dir.path().join("big.exe");
        fs::write(&allowed, vec![0u8; 64]).unwrap();
        fs::write(&disallowed, vec![0u8; 64]).unwrap();

        let validator = FileValidator::new(&policy(&["txt"], 32));
        for path in [allowed, disallowed] {
            assert_eq!(
                validator.validate(&path),
                Err(ValidationError::TooLarge { size: 64, limit: 32 })
            );
        }
    }

    #[test]
    fn wildcard_accepts_any_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Makefile");
        fs::write(&path, b"all:").unwrap();

        let validator = FileValidator::new(&policy(&["*"], 1024));
        assert!(validator.validate(&path).is_ok());
    }
}
