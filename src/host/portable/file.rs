//! Local font files: reference keys, the file loader and file streams.
//!
//! A reference key is the file's last-write time (seconds since the Unix
//! epoch, 8 bytes little-endian) followed by the UTF-16LE path, the same
//! layout the DirectWrite local loader uses.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::handle::Handle;
use crate::host::{FileFragment, FontFile, FontFileLoader, FontFileStream, HostError};

const KEY_HEADER_LEN: usize = 8;

#[cfg(unix)]
const ESCAPED_BYTE_BASE: u16 = 0xDC00;

pub(crate) fn encode_key(path: &Path, last_write_time: Option<SystemTime>) -> Vec<u8> {
    let stamp = last_write_time
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let units = path_units(path);

    let mut key = Vec::with_capacity(KEY_HEADER_LEN + units.len() * 2);
    key.extend_from_slice(&stamp.to_le_bytes());
    for unit in units {
        key.extend_from_slice(&unit.to_le_bytes());
    }
    key
}

pub(crate) fn decode_key(key: &[u8]) -> Option<PathBuf> {
    let body = key.get(KEY_HEADER_LEN..)?;
    if body.is_empty() || body.len() % 2 != 0 {
        return None;
    }
    let units: Vec<u16> = body
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    path_from_units(&units)
}

#[cfg(windows)]
fn path_units(path: &Path) -> Vec<u16> {
    use std::os::windows::ffi::OsStrExt;
    path.as_os_str().encode_wide().collect()
}

#[cfg(windows)]
fn path_from_units(units: &[u16]) -> Option<PathBuf> {
    use std::os::windows::ffi::OsStringExt;
    Some(PathBuf::from(std::ffi::OsString::from_wide(units)))
}

/// Unix paths are bytes. Bytes that are not UTF-8 are carried as lone low
/// surrogates U+DC80..=U+DCFF so the key maps back to the same path.
#[cfg(unix)]
fn path_units(path: &Path) -> Vec<u16> {
    use std::os::unix::ffi::OsStrExt;

    let mut units = Vec::new();
    for chunk in path.as_os_str().as_bytes().utf8_chunks() {
        units.extend(chunk.valid().encode_utf16());
        units.extend(
            chunk
                .invalid()
                .iter()
                .map(|&byte| ESCAPED_BYTE_BASE | u16::from(byte)),
        );
    }
    units
}

#[cfg(unix)]
fn path_from_units(units: &[u16]) -> Option<PathBuf> {
    use std::os::unix::ffi::OsStringExt;

    let mut bytes = Vec::with_capacity(units.len());
    for decoded in char::decode_utf16(units.iter().copied()) {
        match decoded {
            Ok(ch) => {
                let mut buf = [0u8; 4];
                bytes.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
            }
            Err(e) if (ESCAPED_BYTE_BASE | 0x80..=ESCAPED_BYTE_BASE | 0xFF)
                .contains(&e.unpaired_surrogate()) =>
            {
                bytes.push((e.unpaired_surrogate() & 0xFF) as u8);
            }
            Err(_) => return None,
        }
    }
    Some(PathBuf::from(std::ffi::OsString::from_vec(bytes)))
}

#[cfg(not(any(unix, windows)))]
fn path_units(path: &Path) -> Vec<u16> {
    path.to_string_lossy().encode_utf16().collect()
}

#[cfg(not(any(unix, windows)))]
fn path_from_units(units: &[u16]) -> Option<PathBuf> {
    String::from_utf16(units).ok().map(PathBuf::from)
}

/// Loader for files on the local file system.
pub(crate) struct LocalFileLoader;

impl FontFileLoader for LocalFileLoader {
    fn create_stream_from_key(&self, key: &[u8]) -> Result<Handle<dyn FontFileStream>, HostError> {
        let path = decode_key(key).ok_or(HostError::InvalidArgument)?;
        let stream = LocalFileStream::open(&path)?;
        Ok(Handle::from_arc(Arc::new(stream) as Arc<dyn FontFileStream>))
    }
}

pub(crate) struct LocalFontFile {
    key: Vec<u8>,
    loader: Handle<dyn FontFileLoader>,
}

impl LocalFontFile {
    pub(crate) fn new(
        path: &Path,
        last_write_time: Option<SystemTime>,
        loader: Handle<dyn FontFileLoader>,
    ) -> Self {
        Self {
            key: encode_key(path, last_write_time),
            loader,
        }
    }
}

impl FontFile for LocalFontFile {
    fn reference_key(&self) -> Result<&[u8], HostError> {
        Ok(&self.key)
    }

    fn loader(&self) -> Result<Handle<dyn FontFileLoader>, HostError> {
        Ok(self.loader.clone())
    }
}

/// An open font file. Fragments are read on demand; the file is never
/// loaded as a whole unless a caller asks for the whole range.
pub(crate) struct LocalFileStream {
    file: Mutex<File>,
    size: u64,
}

impl LocalFileStream {
    pub(crate) fn open(path: &Path) -> Result<Self, HostError> {
        let file = File::open(path)?;
        let size = file.metadata()?.len();
        Ok(Self {
            file: Mutex::new(file),
            size,
        })
    }
}

impl FontFileStream for LocalFileStream {
    fn file_size(&self) -> Result<u64, HostError> {
        Ok(self.size)
    }

    fn read_fragment(&self, offset: u64, length: u64) -> Result<FileFragment<'_>, HostError> {
        let end = offset.checked_add(length).ok_or(HostError::InvalidArgument)?;
        if end > self.size {
            return Err(HostError::InvalidArgument);
        }
        let length = usize::try_from(length).map_err(|_| HostError::InvalidArgument)?;

        let mut bytes = vec![0u8; length];
        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(&mut bytes)?;
        Ok(FileFragment::owned(bytes))
    }
}
