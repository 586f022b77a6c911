//! The contract between a font provider and the font-selection engine.
//!
//! The engine owns matching and scoring. A provider feeds it fonts through
//! [`FontRegistry::add_font`] and later answers the engine's questions about
//! those fonts through [`FontProviderFuncs`].

use crate::provider::{FontMetadata, FontPrivate};

/// Implemented by the engine.
pub trait FontRegistry {
    /// Takes ownership of `private`. Returns false when the engine rejects
    /// the font, in which case the record has already been released.
    fn add_font(
        &mut self,
        metadata: &FontMetadata,
        path: Option<&str>,
        index: u32,
        private: FontPrivate,
    ) -> bool;
}

/// Implemented by the provider. Calls are serialized by the engine.
pub trait FontProviderFuncs {
    /// With `out` absent, returns the size of the font file. Otherwise
    /// copies `length` bytes at `offset` into `out` and returns `length`,
    /// or returns 0 and leaves `out` untouched.
    fn get_data(
        &self,
        font: &mut FontPrivate,
        offset: u64,
        length: u64,
        out: Option<&mut [u8]>,
    ) -> usize;

    fn check_postscript(&self, font: &mut FontPrivate) -> bool;

    fn check_glyph(&self, font: &FontPrivate, codepoint: u32) -> bool;

    fn destroy_font(&self, font: FontPrivate) {
        drop(font);
    }

    /// Direct lookup of fonts by name. Providers that register everything
    /// up front have nothing to add here.
    fn match_fonts(&self, _registry: &mut dyn FontRegistry, _name: &str) -> bool {
        false
    }

    /// Maps a generic family name to a concrete one.
    fn get_substitutions(&self, name: &str) -> Option<&str>;

    /// Family name of a font that can render `codepoint`, preferring
    /// `family`.
    fn get_fallback(&self, family: Option<&str>, codepoint: u32) -> Option<String>;
}
