//! The host font service seam.
//!
//! The adapter never parses font binaries or performs font matching on its
//! own; it drives a host service through the traits in this module. The
//! shapes follow the DirectWrite object model (factory, collections,
//! families, fonts, faces, files, streams, text layouts), with the three
//! callback interfaces the adapter implements for the host:
//! [`CollectionLoader`], [`FontFileEnumerator`] and [`TextRenderer`].

pub mod portable;

#[cfg(test)]
pub(crate) mod mock;

use std::borrow::Cow;
use std::ops::Deref;
use std::path::Path;
use std::time::SystemTime;

use bitflags::bitflags;
use compact_str::CompactString;

use crate::handle::Handle;

pub use portable::PortableHost;

#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("font service unavailable: {0}")]
    Unavailable(String),
    #[error("invalid argument")]
    InvalidArgument,
    #[error("not implemented")]
    NotImplemented,
    #[error("collection loader is already registered")]
    AlreadyRegistered,
    #[error("collection loader is not registered")]
    NotRegistered,
    #[error("index {index} out of range (count {count})")]
    OutOfRange { index: u32, count: u32 },
    #[error("unsupported font file: {0}")]
    UnsupportedFile(String),
    #[error("no font matches the given face")]
    FontNotFound,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("host operation failed: {0}")]
    Fail(String),
}

/// Width classes as reported by the host, in `usWidthClass` order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u16)]
pub enum FontStretch {
    Undefined = 0,
    UltraCondensed = 1,
    ExtraCondensed = 2,
    Condensed = 3,
    SemiCondensed = 4,
    #[default]
    Normal = 5,
    SemiExpanded = 6,
    Expanded = 7,
    ExtraExpanded = 8,
    UltraExpanded = 9,
}

impl FontStretch {
    /// Alias used by DirectWrite for the normal width.
    pub const MEDIUM: FontStretch = FontStretch::Normal;

    pub fn from_width_class(class: u16) -> Self {
        match class {
            1 => Self::UltraCondensed,
            2 => Self::ExtraCondensed,
            3 => Self::Condensed,
            4 => Self::SemiCondensed,
            5 => Self::Normal,
            6 => Self::SemiExpanded,
            7 => Self::Expanded,
            8 => Self::ExtraExpanded,
            9 => Self::UltraExpanded,
            _ => Self::Undefined,
        }
    }

    pub fn width_class(self) -> u16 {
        self as u16
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FontStyle {
    #[default]
    Normal,
    Oblique,
    Italic,
}

bitflags! {
    /// Styles the host synthesizes instead of reading them from font data.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Simulations: u8 {
        const BOLD = 0b0000_0001;
        const OBLIQUE = 0b0000_0010;
    }
}

/// Outline format of a font face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaceType {
    Cff,
    TrueType,
    OpenTypeCollection,
    Type1,
    Vector,
    Bitmap,
    Unknown,
    RawCff,
}

impl FaceType {
    /// Outline formats of PostScript lineage.
    pub fn is_postscript(self) -> bool {
        matches!(self, FaceType::Cff | FaceType::RawCff | FaceType::Type1)
    }
}

/// Name-table derived strings a font can be asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InformationalStringId {
    Win32FamilyNames,
    Win32SubfamilyNames,
    TypographicFamilyNames,
    FullName,
    PostscriptName,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalizedString {
    pub locale: CompactString,
    pub value: String,
}

/// An ordered list of localizations of one string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalizedStrings {
    entries: Vec<LocalizedString>,
}

impl LocalizedStrings {
    pub fn new(entries: Vec<LocalizedString>) -> Self {
        Self { entries }
    }

    pub fn single(value: impl Into<String>) -> Self {
        Self {
            entries: vec![LocalizedString {
                locale: CompactString::from("en-us"),
                value: value.into(),
            }],
        }
    }

    pub fn count(&self) -> u32 {
        self.entries.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn locale(&self, index: u32) -> Option<&str> {
        self.entries.get(index as usize).map(|e| e.locale.as_str())
    }

    /// Returns the string at `index`, bounded to a buffer of `max_units`
    /// UTF-16 code units including the terminator. Longer strings are cut at
    /// the last whole character that fits.
    pub fn get_string(&self, index: u32, max_units: usize) -> Result<String, HostError> {
        let entry = self
            .entries
            .get(index as usize)
            .ok_or(HostError::OutOfRange {
                index,
                count: self.count(),
            })?;
        if max_units == 0 {
            return Err(HostError::InvalidArgument);
        }
        Ok(truncate_utf16(&entry.value, max_units - 1))
    }

    pub fn iter(&self) -> impl Iterator<Item = &LocalizedString> {
        self.entries.iter()
    }
}

fn truncate_utf16(value: &str, max_units: usize) -> String {
    let mut units = 0;
    let mut end = 0;
    for (idx, ch) in value.char_indices() {
        let len = ch.len_utf16();
        if units + len > max_units {
            break;
        }
        units += len;
        end = idx + ch.len_utf8();
    }
    value[..end].to_owned()
}

/// Bytes handed out by [`FontFileStream::read_fragment`].
pub struct FileFragment<'a> {
    bytes: Cow<'a, [u8]>,
}

impl<'a> FileFragment<'a> {
    pub fn borrowed(bytes: &'a [u8]) -> Self {
        Self {
            bytes: Cow::Borrowed(bytes),
        }
    }

    pub fn owned(bytes: Vec<u8>) -> Self {
        Self {
            bytes: Cow::Owned(bytes),
        }
    }
}

impl Deref for FileFragment<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.bytes
    }
}

/// Random access to the bytes of one font file.
pub trait FontFileStream: Send + Sync {
    fn file_size(&self) -> Result<u64, HostError>;

    /// Returns exactly `length` bytes starting at `offset`, or an error.
    fn read_fragment(&self, offset: u64, length: u64) -> Result<FileFragment<'_>, HostError>;
}

pub trait FontFileLoader: Send + Sync {
    fn create_stream_from_key(&self, key: &[u8]) -> Result<Handle<dyn FontFileStream>, HostError>;
}

pub trait FontFile: Send + Sync {
    /// Opaque, loader-specific token locating the file's data.
    fn reference_key(&self) -> Result<&[u8], HostError>;

    fn loader(&self) -> Result<Handle<dyn FontFileLoader>, HostError>;
}

pub trait FontFace: Send + Sync {
    fn face_type(&self) -> FaceType;

    /// Files backing this face. Hosts that map a face to exactly one file
    /// return a single element.
    fn files(&self) -> Result<Vec<Handle<dyn FontFile>>, HostError>;

    /// Index of the face within its file (non-zero for collection members).
    fn index(&self) -> u32;

    fn simulations(&self) -> Simulations;
}

pub trait Font: Send + Sync {
    fn weight(&self) -> u16;
    fn stretch(&self) -> FontStretch;
    fn style(&self) -> FontStyle;
    fn simulations(&self) -> Simulations;

    /// `Ok(None)` when the font has no strings of that kind.
    fn informational_strings(
        &self,
        id: InformationalStringId,
    ) -> Result<Option<LocalizedStrings>, HostError>;

    fn has_character(&self, codepoint: u32) -> Result<bool, HostError>;

    fn create_font_face(&self) -> Result<Handle<dyn FontFace>, HostError>;
}

pub trait FontFamily: Send + Sync {
    fn font_count(&self) -> u32;
    fn font(&self, index: u32) -> Result<Handle<dyn Font>, HostError>;
    fn family_names(&self) -> Result<LocalizedStrings, HostError>;
}

pub trait FontCollection: Send + Sync {
    fn family_count(&self) -> u32;
    fn family(&self, index: u32) -> Result<Handle<dyn FontFamily>, HostError>;

    /// Finds a family by any of its names, case-insensitively.
    fn find_family_name(&self, name: &str) -> Option<u32>;

    /// Maps a face (for example one seen during a draw pass) back to the
    /// font entry this collection knows it as.
    fn font_from_font_face(&self, face: &dyn FontFace) -> Result<Handle<dyn Font>, HostError>;
}

/// Forward-only cursor over font files, implemented by the adapter.
pub trait FontFileEnumerator: Send + Sync {
    fn move_next(&self) -> Result<bool, HostError>;
    fn current_font_file(&self) -> Result<Handle<dyn FontFile>, HostError>;
}

/// Turns a collection key into an enumerator, implemented by the adapter.
pub trait CollectionLoader: Send + Sync {
    fn create_enumerator(
        &self,
        factory: Handle<dyn Factory>,
        key: &[u8],
    ) -> Result<Handle<dyn FontFileEnumerator>, HostError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextFormatParams {
    pub family: String,
    pub weight: u16,
    pub style: FontStyle,
    pub stretch: FontStretch,
    pub size: f32,
    pub locale: String,
}

pub trait TextFormat: Send + Sync {
    fn params(&self) -> &TextFormatParams;
}

pub trait TextLayout: Send + Sync {
    /// Lays out the text and reports every drawing operation to `renderer`.
    fn draw(&self, renderer: &dyn TextRenderer, origin_x: f32, origin_y: f32)
        -> Result<(), HostError>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub m11: f32,
    pub m12: f32,
    pub m21: f32,
    pub m22: f32,
    pub dx: f32,
    pub dy: f32,
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix {
        m11: 1.0,
        m12: 0.0,
        m21: 0.0,
        m22: 1.0,
        dx: 0.0,
        dy: 0.0,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasuringMode {
    Natural,
    GdiClassic,
    GdiNatural,
}

/// One run of glyphs sharing a face, as reported during a draw pass.
pub struct GlyphRun<'a> {
    pub font_face: &'a dyn FontFace,
    pub font_em_size: f32,
    pub glyph_count: u32,
    pub is_sideways: bool,
    pub bidi_level: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decoration {
    pub width: f32,
    pub thickness: f32,
    pub offset: f32,
}

/// Receiver of layout drawing operations, implemented by the adapter.
pub trait TextRenderer: Send + Sync {
    fn is_pixel_snapping_disabled(&self) -> Result<bool, HostError>;
    fn current_transform(&self) -> Result<Matrix, HostError>;
    fn pixels_per_dip(&self) -> Result<f32, HostError>;

    fn draw_glyph_run(
        &self,
        baseline_origin: (f32, f32),
        measuring_mode: MeasuringMode,
        run: &GlyphRun<'_>,
    ) -> Result<(), HostError>;

    fn draw_underline(
        &self,
        baseline_origin: (f32, f32),
        underline: &Decoration,
    ) -> Result<(), HostError>;

    fn draw_strikethrough(
        &self,
        baseline_origin: (f32, f32),
        strikethrough: &Decoration,
    ) -> Result<(), HostError>;

    fn draw_inline_object(
        &self,
        origin: (f32, f32),
        is_sideways: bool,
        is_right_to_left: bool,
    ) -> Result<(), HostError>;
}

pub trait Factory: Send + Sync {
    fn system_font_collection(&self) -> Result<Handle<dyn FontCollection>, HostError>;

    fn register_collection_loader(
        &self,
        loader: Handle<dyn CollectionLoader>,
    ) -> Result<(), HostError>;

    fn unregister_collection_loader(
        &self,
        loader: &Handle<dyn CollectionLoader>,
    ) -> Result<(), HostError>;

    /// Builds a collection from the files the loader enumerates for `key`.
    /// The loader must have been registered first.
    fn create_custom_collection(
        &self,
        loader: &Handle<dyn CollectionLoader>,
        key: &[u8],
    ) -> Result<Handle<dyn FontCollection>, HostError>;

    fn create_font_file_reference(
        &self,
        path: &Path,
        last_write_time: Option<SystemTime>,
    ) -> Result<Handle<dyn FontFile>, HostError>;

    fn create_text_format(
        &self,
        params: TextFormatParams,
    ) -> Result<Handle<dyn TextFormat>, HostError>;

    fn create_text_layout(
        &self,
        text: &[u16],
        format: &Handle<dyn TextFormat>,
        max_width: f32,
        max_height: f32,
    ) -> Result<Handle<dyn TextLayout>, HostError>;
}

/// Entry point to a font service.
pub trait Host {
    fn create_factory(&self) -> Result<Handle<dyn Factory>, HostError>;
}
