//! Text formats and the single-run text layout.

use std::sync::Arc;

use super::collection::PortableCollection;
use crate::host::{
    GlyphRun, HostError, MeasuringMode, TextFormat, TextFormatParams, TextLayout, TextRenderer,
};

pub(crate) struct PortableTextFormat {
    params: TextFormatParams,
}

impl PortableTextFormat {
    pub(crate) fn new(params: TextFormatParams) -> Self {
        Self { params }
    }
}

impl TextFormat for PortableTextFormat {
    fn params(&self) -> &TextFormatParams {
        &self.params
    }
}

/// A laid out string. All characters are drawn with one font, so a draw
/// pass reports at most one glyph run.
pub(crate) struct PortableTextLayout {
    codepoints: Vec<u32>,
    params: TextFormatParams,
    collection: Arc<PortableCollection>,
}

impl PortableTextLayout {
    pub(crate) fn new(
        text: &[u16],
        params: TextFormatParams,
        collection: Arc<PortableCollection>,
    ) -> Self {
        let codepoints = char::decode_utf16(text.iter().copied())
            .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER) as u32)
            .collect();
        Self {
            codepoints,
            params,
            collection,
        }
    }
}

impl TextLayout for PortableTextLayout {
    fn draw(
        &self,
        renderer: &dyn TextRenderer,
        origin_x: f32,
        origin_y: f32,
    ) -> Result<(), HostError> {
        // Renderers may leave these hooks unimplemented.
        let snapping_disabled = renderer.is_pixel_snapping_disabled().unwrap_or(false);
        let pixels_per_dip = renderer.pixels_per_dip().unwrap_or(1.0);
        let measuring_mode = if snapping_disabled {
            MeasuringMode::Natural
        } else {
            MeasuringMode::GdiNatural
        };

        if self.codepoints.is_empty() {
            return Ok(());
        }
        let Some(font) = self.collection.select_for_text(&self.params, &self.codepoints) else {
            log::debug!("No font available to lay out {} characters", self.codepoints.len());
            return Ok(());
        };

        let face = font.face();
        let run = GlyphRun {
            font_face: &face,
            font_em_size: self.params.size * pixels_per_dip,
            glyph_count: self.codepoints.len() as u32,
            is_sideways: false,
            bidi_level: 0,
        };
        renderer.draw_glyph_run((origin_x, origin_y), measuring_mode, &run)
    }
}
