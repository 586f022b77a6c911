use compact_str::CompactString;

use crate::host::{FontStretch, FontStyle};

/// Slant as the engine scores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u16)]
pub enum Slant {
    #[default]
    None = 0,
    Italic = 100,
    Oblique = 110,
}

impl From<FontStyle> for Slant {
    fn from(style: FontStyle) -> Self {
        match style {
            FontStyle::Normal => Slant::None,
            FontStyle::Italic => Slant::Italic,
            FontStyle::Oblique => Slant::Oblique,
        }
    }
}

pub const FONT_WIDTH_CONDENSED: u16 = 75;
pub const FONT_WIDTH_NORMAL: u16 = 100;
pub const FONT_WIDTH_EXPANDED: u16 = 125;

/// Maps a host stretch value onto the engine's 50..=200 width scale.
pub fn map_width(stretch: FontStretch) -> u16 {
    match stretch {
        FontStretch::UltraCondensed => 50,
        FontStretch::ExtraCondensed => 63,
        FontStretch::Condensed => FONT_WIDTH_CONDENSED,
        FontStretch::SemiCondensed => 88,
        FontStretch::Normal => FONT_WIDTH_NORMAL,
        FontStretch::SemiExpanded => 113,
        FontStretch::Expanded => FONT_WIDTH_EXPANDED,
        FontStretch::ExtraExpanded => 150,
        FontStretch::UltraExpanded => 200,
        FontStretch::Undefined => FONT_WIDTH_NORMAL,
    }
}

/// Normalized description of one physical font, built during a scan and
/// handed to the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FontMetadata {
    pub weight: u16,
    pub width: u16,
    pub slant: Slant,
    pub postscript_name: Option<CompactString>,
    pub families: Vec<CompactString>,
    pub full_names: Vec<CompactString>,
}

/// Generic family names and the concrete families they stand for.
#[derive(Debug, Clone)]
pub struct Substitutions {
    entries: Vec<(CompactString, CompactString)>,
}

impl Default for Substitutions {
    fn default() -> Self {
        Self {
            entries: vec![
                ("sans-serif".into(), "Arial".into()),
                ("serif".into(), "Times New Roman".into()),
                ("monospace".into(), "Courier New".into()),
            ],
        }
    }
}

impl Substitutions {
    /// The built-in table plus `extra`. Extra entries never shadow the
    /// built-in ones.
    pub fn with_extra<'a>(extra: impl IntoIterator<Item = (&'a String, &'a String)>) -> Self {
        let mut substitutions = Self::default();
        for (name, family) in extra {
            if substitutions.lookup(name).is_none() {
                substitutions
                    .entries
                    .push((CompactString::from(name.as_str()), CompactString::from(family.as_str())));
            } else {
                log::debug!("Ignoring substitution for built-in generic family {}", name);
            }
        }
        substitutions
    }

    pub fn lookup(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(generic, _)| generic.eq_ignore_ascii_case(name))
            .map(|(_, family)| family.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(a, b)| (a.as_str(), b.as_str()))
    }
}
