//! Fallback font resolution through the host's text layout.
//!
//! Instead of matching fonts itself, the resolver lays out the requested
//! character with the host and records which font the host drew it with.

use std::sync::{Mutex, PoisonError};

use crate::constants::{FALLBACK_FONT_SIZE, FALLBACK_FONT_WEIGHT, FALLBACK_LOCALE};
use crate::handle::Handle;
use crate::host::{
    Decoration, Factory, Font, FontStretch, FontStyle, GlyphRun, HostError,
    InformationalStringId, Matrix, MeasuringMode, TextFormatParams, TextRenderer,
};

/// Encodes a codepoint as one or two UTF-16 units. Codepoints past
/// U+10FFFF have no encoding.
pub fn encode_utf16(codepoint: u32) -> Option<Vec<u16>> {
    match codepoint {
        0..=0xFFFF => Some(vec![codepoint as u16]),
        0x1_0000..=0x10_FFFF => Some(vec![
            ((codepoint >> 10) + 0xD7C0) as u16,
            ((codepoint & 0x3FF) + 0xDC00) as u16,
        ]),
        _ => None,
    }
}

/// Renderer that draws nothing and remembers the font of the first glyph
/// run it sees.
pub struct FallbackLogRenderer {
    factory: Handle<dyn Factory>,
    font: Mutex<Option<Handle<dyn Font>>>,
}

impl FallbackLogRenderer {
    pub fn new(factory: Handle<dyn Factory>) -> Self {
        Self {
            factory,
            font: Mutex::new(None),
        }
    }

    pub fn take_font(&self) -> Option<Handle<dyn Font>> {
        self.font
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

impl TextRenderer for FallbackLogRenderer {
    fn is_pixel_snapping_disabled(&self) -> Result<bool, HostError> {
        Ok(true)
    }

    fn current_transform(&self) -> Result<Matrix, HostError> {
        Err(HostError::NotImplemented)
    }

    fn pixels_per_dip(&self) -> Result<f32, HostError> {
        Err(HostError::NotImplemented)
    }

    fn draw_glyph_run(
        &self,
        _baseline_origin: (f32, f32),
        _measuring_mode: MeasuringMode,
        run: &GlyphRun<'_>,
    ) -> Result<(), HostError> {
        let mut slot = self.font.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return Ok(());
        }
        let collection = self.factory.system_font_collection()?;
        *slot = Some(collection.font_from_font_face(run.font_face)?);
        Ok(())
    }

    fn draw_underline(
        &self,
        _baseline_origin: (f32, f32),
        _underline: &Decoration,
    ) -> Result<(), HostError> {
        Ok(())
    }

    fn draw_strikethrough(
        &self,
        _baseline_origin: (f32, f32),
        _strikethrough: &Decoration,
    ) -> Result<(), HostError> {
        Ok(())
    }

    fn draw_inline_object(
        &self,
        _origin: (f32, f32),
        _is_sideways: bool,
        _is_right_to_left: bool,
    ) -> Result<(), HostError> {
        Ok(())
    }
}

pub struct FallbackResolver {
    factory: Handle<dyn Factory>,
    default_family: String,
    name_max_length: usize,
}

impl FallbackResolver {
    pub fn new(factory: Handle<dyn Factory>, default_family: &str, name_max_length: usize) -> Self {
        Self {
            factory,
            default_family: default_family.to_owned(),
            name_max_length,
        }
    }

    /// Family name of the font the host picks for `codepoint` when asked
    /// for `base`. `None` when nothing suitable exists.
    pub fn resolve(&self, base: Option<&str>, codepoint: u32) -> Option<String> {
        match self.try_resolve(base, codepoint) {
            Ok(family) => family,
            Err(e) => {
                log::debug!("Fallback lookup for U+{:04X} failed: {}", codepoint, e);
                None
            }
        }
    }

    fn try_resolve(&self, base: Option<&str>, codepoint: u32) -> Result<Option<String>, HostError> {
        let Some(text) = encode_utf16(codepoint) else {
            return Ok(None);
        };

        let format = self.factory.create_text_format(TextFormatParams {
            family: base.unwrap_or(&self.default_family).to_owned(),
            weight: FALLBACK_FONT_WEIGHT,
            style: FontStyle::Normal,
            stretch: FontStretch::Normal,
            size: FALLBACK_FONT_SIZE,
            locale: FALLBACK_LOCALE.to_owned(),
        })?;
        let layout = self.factory.create_text_layout(&text, &format, 0.0, 0.0)?;

        let renderer = Handle::new(FallbackLogRenderer::new(self.factory.clone()));
        layout.draw(&*renderer, 0.0, 0.0)?;
        drop(layout);
        drop(format);

        let Some(font) = renderer.take_font() else {
            return Ok(None);
        };

        let Some(names) = font.informational_strings(InformationalStringId::Win32FamilyNames)?
        else {
            return Ok(None);
        };
        let family = names.get_string(0, self.name_max_length)?;

        // The host may have drawn with a font lacking the glyph.
        if codepoint > 0 && !font.has_character(codepoint)? {
            return Ok(None);
        }

        Ok(Some(family))
    }
}
