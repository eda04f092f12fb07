// Credential persistence to a single JSON file

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use super::types::Credential;
use crate::error::AuthError;

/// File name of the persisted credential
pub const TOKEN_FILE_NAME: &str = "token.json";

/// Default per-user credential path: `~/.mcp/xiaoyuzhoufm-mcp/token.json`
pub fn default_token_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| {
        home.join(".mcp")
            .join("xiaoyuzhoufm-mcp")
            .join(TOKEN_FILE_NAME)
    })
}

/// Load a complete credential from `path`
///
/// A missing file is `NotFound`, unparseable or partial content is `Corrupt`,
/// anything else is `Io`.
pub fn load_from_file(path: &Path) -> Result<Credential, AuthError> {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(AuthError::NotFound(path.to_path_buf()));
        }
        Err(source) => {
            return Err(AuthError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let mut cred: Credential =
        serde_json::from_slice(&data).map_err(|e| AuthError::Corrupt {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    if !cred.is_complete() {
        tracing::warn!("Loaded credential is incomplete: {}", path.display());
        return Err(AuthError::Corrupt {
            path: path.to_path_buf(),
            reason: "access_token and refresh_token must both be set".to_string(),
        });
    }

    cred.source_path = Some(path.to_path_buf());
    tracing::debug!("Credential loaded from {}", path.display());
    Ok(cred)
}

/// Persist `cred` to `path` with owner-only permissions
///
/// Writes a sibling temp file and renames it over the target, so a crash
/// leaves either the old file or the new one.
pub fn save_to_file(cred: &mut Credential, path: &Path) -> Result<(), AuthError> {
    let io_err = |source: io::Error| AuthError::Io {
        path: path.to_path_buf(),
        source,
    };

    if path.as_os_str().is_empty() {
        return Err(io_err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "credential path cannot be empty",
        )));
    }

    let data = serde_json::to_vec_pretty(cred).map_err(|e| io_err(io::Error::other(e)))?;

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        create_private_dir(dir).map_err(io_err)?;
    }

    let tmp_path = temp_sibling(path);
    let written = write_private_file(&tmp_path, &data).and_then(|_| fs::rename(&tmp_path, path));
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp_path);
        return Err(io_err(e));
    }

    cred.source_path = Some(path.to_path_buf());
    tracing::debug!("Credential saved to {}", path.display());
    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| TOKEN_FILE_NAME.to_string());
    path.with_file_name(format!(".{}.{}.tmp", name, std::process::id()))
}

#[cfg(unix)]
fn create_private_dir(dir: &Path) -> io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    fs::DirBuilder::new().recursive(true).mode(0o700).create(dir)
}

#[cfg(not(unix))]
fn create_private_dir(dir: &Path) -> io::Result<()> {
    fs::create_dir_all(dir)
}

fn write_private_file(path: &Path, data: &[u8]) -> io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    file.write_all(data)?;
    file.sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample() -> Credential {
        Credential {
            access_token: "A1".to_string(),
            refresh_token: "R1".to_string(),
            uid: "u-42".to_string(),
            nickname: "listener".to_string(),
            last_refreshed_at: 1_700_000_000,
            source_path: None,
        }
    }

    #[test]
    fn test_load_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");
        let err = load_from_file(&path).unwrap_err();
        assert!(matches!(err, AuthError::NotFound(p) if p == path));
    }

    #[test]
    fn test_load_access_token_only_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(TOKEN_FILE_NAME);
        fs::write(&path, r#"{"access_token":"A1"}"#).unwrap();
        assert!(matches!(
            load_from_file(&path).unwrap_err(),
            AuthError::Corrupt { .. }
        ));
    }

    #[test]
    fn test_load_garbage_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(TOKEN_FILE_NAME);
        fs::write(&path, "{\"access_token\": \"A1\", \"refr").unwrap();
        assert!(matches!(
            load_from_file(&path).unwrap_err(),
            AuthError::Corrupt { .. }
        ));
    }

    #[test]
    fn test_load_directory_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_from_file(dir.path()).unwrap_err(),
            AuthError::Io { .. }
        ));
    }

    #[test]
    fn test_save_creates_missing_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join(TOKEN_FILE_NAME);
        let mut cred = sample();

        save_to_file(&mut cred, &path).unwrap();

        assert!(path.exists());
        assert_eq!(cred.source_path.as_deref(), Some(path.as_path()));
        let leftovers: Vec<_> = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_save_permissions_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let parent = dir.path().join("cfg");
        let path = parent.join(TOKEN_FILE_NAME);
        save_to_file(&mut sample(), &path).unwrap();

        let file_mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        let dir_mode = fs::metadata(&parent).unwrap().permissions().mode() & 0o777;
        assert_eq!(file_mode, 0o600);
        assert_eq!(dir_mode & 0o077, 0);
    }

    #[test]
    fn test_save_empty_path_rejected() {
        let err = save_to_file(&mut sample(), Path::new("")).unwrap_err();
        assert!(matches!(err, AuthError::Io { .. }));
    }

    #[test]
    fn test_save_overwrites_existing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(TOKEN_FILE_NAME);
        save_to_file(&mut sample(), &path).unwrap();

        let mut updated = sample();
        updated.refresh_token = "R2".to_string();
        save_to_file(&mut updated, &path).unwrap();

        let loaded = load_from_file(&path).unwrap();
        assert_eq!(loaded.refresh_token, "R2");
    }

    proptest! {
        #[test]
        fn prop_save_then_load_round_trips(
            access in "[A-Za-z0-9._-]{1,64}",
            refresh in "[A-Za-z0-9._-]{1,64}",
            uid in "[a-f0-9]{0,24}",
            nickname in "\\PC{0,16}",
            ts in 0i64..4_000_000_000,
        ) {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join(TOKEN_FILE_NAME);
            let mut cred = Credential {
                access_token: access,
                refresh_token: refresh,
                uid,
                nickname,
                last_refreshed_at: ts,
                source_path: None,
            };

            save_to_file(&mut cred, &path).unwrap();
            let loaded = load_from_file(&path).unwrap();

            prop_assert!(loaded.same_contents(&cred));
            prop_assert_eq!(loaded.source_path, Some(path));
        }
    }
}
