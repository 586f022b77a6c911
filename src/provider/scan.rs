//! Turns the fonts of a host collection into engine registrations.

use compact_str::CompactString;

use super::font_data::FontPrivate;
use super::metadata::{map_width, FontMetadata, Slant};
use crate::engine::FontRegistry;
use crate::host::{Font, FontCollection, FontFamily, HostError, InformationalStringId, LocalizedStrings};

/// Units of the reference key header (the 8-byte timestamp).
const KEY_HEADER_UNITS: usize = 4;

/// Outcome of one scan pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub registered: usize,
    /// Synthesized bold or oblique entries, never registered.
    pub simulated: usize,
    /// Fonts whose metadata could not be read.
    pub failed: usize,
    /// Fonts the engine declined.
    pub rejected: usize,
}

impl std::ops::AddAssign for ScanSummary {
    fn add_assign(&mut self, other: Self) {
        self.registered += other.registered;
        self.simulated += other.simulated;
        self.failed += other.failed;
        self.rejected += other.rejected;
    }
}

/// Registers every physical font of `collection` with `registry`.
///
/// A failure while reading one font skips only that font.
pub fn scan_fonts(
    collection: &dyn FontCollection,
    registry: &mut dyn FontRegistry,
    name_max_length: usize,
) -> ScanSummary {
    let mut summary = ScanSummary::default();

    for i in 0..collection.family_count() {
        let family = match collection.family(i) {
            Ok(family) => family,
            Err(e) => {
                log::debug!("Skipping font family {}: {}", i, e);
                continue;
            }
        };

        for j in 0..family.font_count() {
            let font = match family.font(j) {
                Ok(font) => font,
                Err(e) => {
                    log::debug!("Skipping font {} of family {}: {}", j, i, e);
                    summary.failed += 1;
                    continue;
                }
            };

            if !font.simulations().is_empty() {
                summary.simulated += 1;
                continue;
            }

            let metadata = match extract_metadata(&*font, &*family, name_max_length) {
                Ok(metadata) => metadata,
                Err(e) => {
                    log::debug!("Skipping font {} of family {}: {}", j, i, e);
                    summary.failed += 1;
                    continue;
                }
            };

            let (path, index) = match font_location(&*font) {
                Some((path, index)) => (path, index),
                None => (None, 0),
            };

            if registry.add_font(&metadata, path.as_deref(), index, FontPrivate::new(font)) {
                summary.registered += 1;
            } else {
                summary.rejected += 1;
            }
        }
    }

    summary
}

/// Reads the normalized metadata of one font.
pub fn extract_metadata(
    font: &dyn Font,
    family: &dyn FontFamily,
    name_max_length: usize,
) -> Result<FontMetadata, HostError> {
    let postscript_name = match font.informational_strings(InformationalStringId::PostscriptName)? {
        Some(names) if !names.is_empty() => Some(CompactString::from(
            names.get_string(0, name_max_length)?,
        )),
        _ => None,
    };

    let full_names = match font.informational_strings(InformationalStringId::FullName)? {
        Some(names) => all_strings(&names, name_max_length)?,
        None => Vec::new(),
    };

    let family_names = match font.informational_strings(InformationalStringId::Win32FamilyNames) {
        Ok(Some(names)) => names,
        _ => family.family_names()?,
    };

    Ok(FontMetadata {
        weight: font.weight(),
        width: map_width(font.stretch()),
        slant: Slant::from(font.style()),
        postscript_name,
        families: all_strings(&family_names, name_max_length)?,
        full_names,
    })
}

fn all_strings(
    strings: &LocalizedStrings,
    name_max_length: usize,
) -> Result<Vec<CompactString>, HostError> {
    (0..strings.count())
        .map(|k| strings.get_string(k, name_max_length).map(CompactString::from))
        .collect()
}

/// On-disk path and face index of a font, best effort.
pub fn font_location(font: &dyn Font) -> Option<(Option<String>, u32)> {
    let face = font.create_font_face().ok()?;
    let index = face.index();
    let path = face
        .files()
        .ok()
        .and_then(|files| files.into_iter().next())
        .and_then(|file| file.reference_key().ok().and_then(path_from_reference_key));
    Some((path, index))
}

/// Recovers a file path from a local loader reference key: a timestamp
/// followed by the UTF-16LE path. Keys from other loaders yield `None`.
pub fn path_from_reference_key(key: &[u8]) -> Option<String> {
    let units: Vec<u16> = key
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    let body = units.get(KEY_HEADER_UNITS..)?;
    let body = match body.iter().position(|&u| u == 0) {
        Some(end) => &body[..end],
        None => body,
    };

    let start = match body.iter().position(|&u| u == u16::from(b':')) {
        Some(colon) if colon >= 1 => colon - 1,
        Some(_) => return None,
        None if matches!(body.first(), Some(&u) if u == u16::from(b'/') || u == u16::from(b'\\')) => 0,
        None => return None,
    };

    let path = String::from_utf16_lossy(&body[start..]);
    (!path.is_empty()).then_some(path)
}
