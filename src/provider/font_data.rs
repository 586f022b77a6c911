//! Per-font private record with lazy access to the font's bytes.

use crate::handle::Handle;
use crate::host::{Font, FontFace, FontFileStream, HostError};

/// What the engine holds for every registered font.
///
/// Only the font handle exists up front. The face is created on the first
/// face-level query and the stream on the first byte access. Fields are
/// declared in release order: stream, then face, then font.
pub struct FontPrivate {
    stream: Option<Handle<dyn FontFileStream>>,
    face: Option<Handle<dyn FontFace>>,
    font: Handle<dyn Font>,
}

impl FontPrivate {
    pub fn new(font: Handle<dyn Font>) -> Self {
        Self {
            stream: None,
            face: None,
            font,
        }
    }

    pub fn font(&self) -> &Handle<dyn Font> {
        &self.font
    }

    pub fn has_face(&self) -> bool {
        self.face.is_some()
    }

    pub fn has_stream(&self) -> bool {
        self.stream.is_some()
    }

    fn face(&mut self) -> Result<&Handle<dyn FontFace>, HostError> {
        let face = match self.face.take() {
            Some(face) => face,
            None => self.font.create_font_face()?,
        };
        Ok(&*self.face.insert(face))
    }

    fn stream(&mut self) -> Result<&Handle<dyn FontFileStream>, HostError> {
        if self.stream.is_none() {
            let face = self.face()?;
            // One file per face.
            let files = face.files()?;
            let file = files.first().ok_or(HostError::FontNotFound)?;
            let key = file.reference_key()?;
            let stream = file.loader()?.create_stream_from_key(key)?;
            self.stream = Some(stream);
        }
        self.stream.as_ref().ok_or(HostError::FontNotFound)
    }

    /// Reads font file bytes.
    ///
    /// With `out` absent, returns the total file size and ignores `offset`
    /// and `length`. Otherwise copies exactly `length` bytes starting at
    /// `offset` into the front of `out` and returns `length`. Any failure
    /// returns 0 and leaves `out` untouched.
    pub fn read(&mut self, offset: u64, length: u64, out: Option<&mut [u8]>) -> usize {
        let stream = match self.stream() {
            Ok(stream) => stream,
            Err(e) => {
                log::debug!("Cannot open font stream: {}", e);
                return 0;
            }
        };

        let Some(out) = out else {
            return stream
                .file_size()
                .ok()
                .and_then(|size| usize::try_from(size).ok())
                .unwrap_or(0);
        };

        let Ok(len) = usize::try_from(length) else {
            return 0;
        };
        if out.len() < len {
            return 0;
        }
        let in_bounds = stream
            .file_size()
            .ok()
            .zip(offset.checked_add(length))
            .is_some_and(|(size, end)| end <= size);
        if !in_bounds {
            return 0;
        }

        match stream.read_fragment(offset, length) {
            Ok(fragment) if fragment.len() == len => {
                out[..len].copy_from_slice(&fragment);
                len
            }
            Ok(_) => 0,
            Err(e) => {
                log::debug!("Font read of {} bytes at {} failed: {}", length, offset, e);
                0
            }
        }
    }

    /// True when the font has `codepoint`. Codepoint 0 is always present.
    pub fn has_glyph(&self, codepoint: u32) -> bool {
        if codepoint == 0 {
            return true;
        }
        self.font.has_character(codepoint).unwrap_or(false)
    }

    /// True for Type 1, CFF and raw CFF outlines.
    pub fn is_postscript_outline(&mut self) -> bool {
        match self.face() {
            Ok(face) => face.face_type().is_postscript(),
            Err(_) => false,
        }
    }
}
