use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::enumerator::DirectoryFontEnumerator;
use crate::handle::Handle;
use crate::host::{CollectionLoader, Factory, FontFileEnumerator, HostError};

/// Collection loader for the private font directory. The collection key is
/// the directory path in its native encoding; every request gets a fresh
/// enumerator.
pub struct LocalCollectionLoader;

impl LocalCollectionLoader {
    #[cfg(unix)]
    pub fn collection_key(dir: &Path) -> Vec<u8> {
        use std::os::unix::ffi::OsStrExt;
        dir.as_os_str().as_bytes().to_vec()
    }

    #[cfg(windows)]
    pub fn collection_key(dir: &Path) -> Vec<u8> {
        use std::os::windows::ffi::OsStrExt;
        dir.as_os_str()
            .encode_wide()
            .flat_map(u16::to_le_bytes)
            .collect()
    }

    #[cfg(not(any(unix, windows)))]
    pub fn collection_key(dir: &Path) -> Vec<u8> {
        dir.to_string_lossy().into_owned().into_bytes()
    }

    #[cfg(unix)]
    fn directory_from_key(key: &[u8]) -> Option<PathBuf> {
        use std::os::unix::ffi::OsStrExt;
        Some(PathBuf::from(std::ffi::OsStr::from_bytes(key)))
    }

    #[cfg(windows)]
    fn directory_from_key(key: &[u8]) -> Option<PathBuf> {
        use std::os::windows::ffi::OsStringExt;
        if key.len() % 2 != 0 {
            return None;
        }
        let units: Vec<u16> = key
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        Some(PathBuf::from(std::ffi::OsString::from_wide(&units)))
    }

    #[cfg(not(any(unix, windows)))]
    fn directory_from_key(key: &[u8]) -> Option<PathBuf> {
        std::str::from_utf8(key).ok().map(PathBuf::from)
    }
}

impl CollectionLoader for LocalCollectionLoader {
    fn create_enumerator(
        &self,
        factory: Handle<dyn Factory>,
        key: &[u8],
    ) -> Result<Handle<dyn FontFileEnumerator>, HostError> {
        let dir = Self::directory_from_key(key).ok_or(HostError::InvalidArgument)?;
        let enumerator = DirectoryFontEnumerator::new(factory, &dir)?;
        Ok(Handle::from_arc(
            Arc::new(enumerator) as Arc<dyn FontFileEnumerator>
        ))
    }
}
