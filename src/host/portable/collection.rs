//! Font collections built from parsed font files.

use std::collections::BTreeMap;
use std::sync::Arc;

use compact_str::CompactString;
use skrifa::attribute::Style;
use skrifa::raw::FileRef;
use skrifa::string::StringId;
use skrifa::{FontRef, MetadataProvider, Tag};

use crate::handle::Handle;
use crate::host::{
    FaceType, Font, FontCollection, FontFace, FontFamily, FontFile, FontStretch, FontStyle,
    HostError, InformationalStringId, LocalizedString, LocalizedStrings, Simulations,
    TextFormatParams,
};

const TRUETYPE_SFNT_VERSION: u32 = 0x0001_0000;
const APPLE_TRUETYPE_SFNT_VERSION: u32 = u32::from_be_bytes(*b"true");

/// Sorted, merged codepoint ranges a face maps to glyphs.
#[derive(Debug, Default)]
pub(crate) struct Coverage {
    ranges: Vec<(u32, u32)>,
}

impl Coverage {
    pub(crate) fn from_codepoints(mut codepoints: Vec<u32>) -> Self {
        codepoints.sort_unstable();
        codepoints.dedup();

        let mut ranges: Vec<(u32, u32)> = Vec::new();
        for cp in codepoints {
            match ranges.last_mut() {
                Some((_, end)) if *end + 1 == cp => *end = cp,
                _ => ranges.push((cp, cp)),
            }
        }
        Self { ranges }
    }

    pub(crate) fn contains(&self, codepoint: u32) -> bool {
        self.ranges
            .binary_search_by(|&(start, end)| {
                if end < codepoint {
                    std::cmp::Ordering::Less
                } else if start > codepoint {
                    std::cmp::Ordering::Greater
                } else {
                    std::cmp::Ordering::Equal
                }
            })
            .is_ok()
    }
}

/// Everything the host knows about one face of one file.
pub(crate) struct FaceRecord {
    pub(crate) file: Handle<dyn FontFile>,
    pub(crate) key: Vec<u8>,
    pub(crate) index: u32,
    pub(crate) face_type: FaceType,
    pub(crate) weight: u16,
    pub(crate) stretch: FontStretch,
    pub(crate) style: FontStyle,
    pub(crate) win32_family: LocalizedStrings,
    pub(crate) win32_subfamily: LocalizedStrings,
    pub(crate) typographic_family: LocalizedStrings,
    pub(crate) full_name: LocalizedStrings,
    pub(crate) postscript_name: LocalizedStrings,
    pub(crate) coverage: Coverage,
}

/// Reads a font file through its loader and parses every face in it.
pub(crate) fn parse_faces(file: &Handle<dyn FontFile>) -> Result<Vec<FaceRecord>, HostError> {
    let key = file.reference_key()?.to_vec();
    let stream = file.loader()?.create_stream_from_key(&key)?;
    let size = stream.file_size()?;
    let bytes = stream.read_fragment(0, size)?;

    let file_ref = FileRef::new(&bytes[..])
        .map_err(|e| HostError::UnsupportedFile(format!("{}", e)))?;
    let is_collection = matches!(file_ref, FileRef::Collection(_));

    let mut records = Vec::new();
    for (index, font) in file_ref.fonts().enumerate() {
        let font = match font {
            Ok(font) => font,
            Err(e) => {
                log::debug!("Skipping unreadable face {} in font file: {}", index, e);
                continue;
            }
        };
        records.push(face_record(file.clone(), key.clone(), index as u32, &font, is_collection));
    }

    if records.is_empty() {
        return Err(HostError::UnsupportedFile("no readable faces".to_owned()));
    }
    Ok(records)
}

fn face_record(
    file: Handle<dyn FontFile>,
    key: Vec<u8>,
    index: u32,
    font: &FontRef,
    is_collection: bool,
) -> FaceRecord {
    let attributes = font.attributes();
    let weight = attributes.weight.value().round().clamp(1.0, 999.0) as u16;
    let style = match attributes.style {
        Style::Normal => FontStyle::Normal,
        Style::Italic => FontStyle::Italic,
        Style::Oblique(_) => FontStyle::Oblique,
    };
    let stretch = stretch_from_ratio(attributes.stretch.ratio());

    let coverage = Coverage::from_codepoints(
        font.charmap().mappings().map(|(codepoint, _)| codepoint).collect(),
    );

    FaceRecord {
        file,
        key,
        index,
        face_type: face_type(font, is_collection),
        weight,
        stretch,
        style,
        win32_family: localized(font, StringId::FAMILY_NAME),
        win32_subfamily: localized(font, StringId::SUBFAMILY_NAME),
        typographic_family: localized(font, StringId::TYPOGRAPHIC_FAMILY_NAME),
        full_name: localized(font, StringId::FULL_NAME),
        postscript_name: localized(font, StringId::POSTSCRIPT_NAME),
        coverage,
    }
}

fn stretch_from_ratio(ratio: f32) -> FontStretch {
    match (ratio * 1000.0).round() as u32 {
        500 => FontStretch::UltraCondensed,
        625 => FontStretch::ExtraCondensed,
        750 => FontStretch::Condensed,
        875 => FontStretch::SemiCondensed,
        1000 => FontStretch::Normal,
        1125 => FontStretch::SemiExpanded,
        1250 => FontStretch::Expanded,
        1500 => FontStretch::ExtraExpanded,
        2000 => FontStretch::UltraExpanded,
        _ => FontStretch::Undefined,
    }
}

fn face_type(font: &FontRef, is_collection: bool) -> FaceType {
    let has = |tag: &[u8; 4]| font.table_data(Tag::new(tag)).is_some();

    if is_collection {
        FaceType::OpenTypeCollection
    } else if has(b"CFF ") || has(b"CFF2") {
        FaceType::Cff
    } else if has(b"glyf") {
        FaceType::TrueType
    } else if has(b"EBDT") || has(b"CBDT") || has(b"sbix") {
        FaceType::Bitmap
    } else {
        match font.table_directory.sfnt_version() {
            TRUETYPE_SFNT_VERSION | APPLE_TRUETYPE_SFNT_VERSION => FaceType::TrueType,
            _ => FaceType::Unknown,
        }
    }
}

/// Collects one name-table string in every language, English first.
fn localized(font: &FontRef, id: StringId) -> LocalizedStrings {
    let mut entries: Vec<LocalizedString> = Vec::new();
    for string in font.localized_strings(id) {
        let locale = CompactString::from(string.language().unwrap_or("").to_ascii_lowercase());
        let value = string.to_string();
        if value.is_empty()
            || entries
                .iter()
                .any(|e| e.locale == locale && e.value == value)
        {
            continue;
        }
        entries.push(LocalizedString { locale, value });
    }
    entries.sort_by_key(|e| !e.locale.starts_with("en"));
    LocalizedStrings::new(entries)
}

/// A font entry: a face record plus the styles the host simulates on top.
pub(crate) struct PortableFont {
    pub(crate) record: Arc<FaceRecord>,
    pub(crate) simulations: Simulations,
    weight: u16,
    style: FontStyle,
}

impl PortableFont {
    fn physical(record: Arc<FaceRecord>) -> Self {
        let weight = record.weight;
        let style = record.style;
        Self {
            record,
            simulations: Simulations::empty(),
            weight,
            style,
        }
    }

    fn simulated(base: &PortableFont, simulations: Simulations) -> Self {
        let weight = if simulations.contains(Simulations::BOLD) {
            700
        } else {
            base.weight
        };
        let style = if simulations.contains(Simulations::OBLIQUE) {
            FontStyle::Oblique
        } else {
            base.style
        };
        Self {
            record: base.record.clone(),
            simulations,
            weight,
            style,
        }
    }

    pub(crate) fn face(&self) -> PortableFace {
        PortableFace {
            record: self.record.clone(),
            simulations: self.simulations,
        }
    }

    pub(crate) fn covers(&self, codepoint: u32) -> bool {
        self.record.coverage.contains(codepoint)
    }

    fn distance(&self, params: &TextFormatParams) -> u32 {
        let stretch = (self.record.stretch.width_class() as i32
            - params.stretch.width_class() as i32)
            .unsigned_abs();
        let style = match (self.style, params.style) {
            (a, b) if a == b => 0,
            (FontStyle::Normal, _) | (_, FontStyle::Normal) => 5000,
            _ => 1000,
        };
        let weight = (self.weight as i32 - params.weight as i32).unsigned_abs();
        let simulated = u32::from(!self.simulations.is_empty());
        stretch * 10_000 + style + weight + simulated
    }
}

impl Font for PortableFont {
    fn weight(&self) -> u16 {
        self.weight
    }

    fn stretch(&self) -> FontStretch {
        self.record.stretch
    }

    fn style(&self) -> FontStyle {
        self.style
    }

    fn simulations(&self) -> Simulations {
        self.simulations
    }

    fn informational_strings(
        &self,
        id: InformationalStringId,
    ) -> Result<Option<LocalizedStrings>, HostError> {
        let strings = match id {
            InformationalStringId::Win32FamilyNames => &self.record.win32_family,
            InformationalStringId::Win32SubfamilyNames => &self.record.win32_subfamily,
            InformationalStringId::TypographicFamilyNames => &self.record.typographic_family,
            InformationalStringId::FullName => &self.record.full_name,
            InformationalStringId::PostscriptName => &self.record.postscript_name,
        };
        Ok((!strings.is_empty()).then(|| strings.clone()))
    }

    fn has_character(&self, codepoint: u32) -> Result<bool, HostError> {
        Ok(self.covers(codepoint))
    }

    fn create_font_face(&self) -> Result<Handle<dyn FontFace>, HostError> {
        Ok(Handle::from_arc(Arc::new(self.face()) as Arc<dyn FontFace>))
    }
}

pub(crate) struct PortableFace {
    record: Arc<FaceRecord>,
    simulations: Simulations,
}

impl FontFace for PortableFace {
    fn face_type(&self) -> FaceType {
        self.record.face_type
    }

    fn files(&self) -> Result<Vec<Handle<dyn FontFile>>, HostError> {
        Ok(vec![self.record.file.clone()])
    }

    fn index(&self) -> u32 {
        self.record.index
    }

    fn simulations(&self) -> Simulations {
        self.simulations
    }
}

pub(crate) struct PortableFamily {
    names: LocalizedStrings,
    fonts: Vec<Arc<PortableFont>>,
}

impl PortableFamily {
    fn matches_name(&self, name: &str) -> bool {
        self.names.iter().any(|n| n.value.eq_ignore_ascii_case(name))
            || self
                .fonts
                .iter()
                .flat_map(|f| f.record.win32_family.iter())
                .any(|n| n.value.eq_ignore_ascii_case(name))
    }

    fn closest(&self, params: &TextFormatParams) -> Option<&Arc<PortableFont>> {
        self.fonts.iter().min_by_key(|f| f.distance(params))
    }

    fn closest_covering(
        &self,
        params: &TextFormatParams,
        codepoints: &[u32],
    ) -> Option<&Arc<PortableFont>> {
        self.fonts
            .iter()
            .filter(|f| codepoints.iter().all(|&cp| f.covers(cp)))
            .min_by_key(|f| f.distance(params))
    }
}

impl FontFamily for PortableFamily {
    fn font_count(&self) -> u32 {
        self.fonts.len() as u32
    }

    fn font(&self, index: u32) -> Result<Handle<dyn Font>, HostError> {
        let font = self.fonts.get(index as usize).ok_or(HostError::OutOfRange {
            index,
            count: self.font_count(),
        })?;
        Ok(Handle::from_arc(font.clone() as Arc<dyn Font>))
    }

    fn family_names(&self) -> Result<LocalizedStrings, HostError> {
        Ok(self.names.clone())
    }
}

#[derive(Default)]
pub(crate) struct PortableCollection {
    families: Vec<Arc<PortableFamily>>,
}

impl PortableCollection {
    /// Groups faces into families and adds the simulated styles a family
    /// lacks. Families are ordered by name, fonts by width, slant and weight.
    pub(crate) fn build(records: Vec<FaceRecord>) -> Self {
        let mut grouped: BTreeMap<String, (LocalizedStrings, Vec<Arc<FaceRecord>>)> =
            BTreeMap::new();
        for record in records {
            let names = if !record.typographic_family.is_empty() {
                record.typographic_family.clone()
            } else if !record.win32_family.is_empty() {
                record.win32_family.clone()
            } else {
                LocalizedStrings::single("Unknown")
            };
            let key = names
                .iter()
                .next()
                .map(|n| n.value.to_lowercase())
                .unwrap_or_default();
            grouped
                .entry(key)
                .or_insert_with(|| (names, Vec::new()))
                .1
                .push(Arc::new(record));
        }

        let families = grouped
            .into_values()
            .map(|(names, records)| {
                let mut fonts: Vec<PortableFont> =
                    records.into_iter().map(PortableFont::physical).collect();
                add_simulations(&mut fonts);
                fonts.sort_by_key(|f| {
                    (
                        f.record.stretch.width_class(),
                        f.style != FontStyle::Normal,
                        f.weight,
                        f.simulations.bits(),
                    )
                });
                Arc::new(PortableFamily {
                    names,
                    fonts: fonts.into_iter().map(Arc::new).collect(),
                })
            })
            .collect();

        Self { families }
    }

    /// Picks the font a layout of `codepoints` in the requested format ends
    /// up using: the requested family when it covers the text, otherwise the
    /// first family that does, otherwise the requested family regardless.
    pub(crate) fn select_for_text(
        &self,
        params: &TextFormatParams,
        codepoints: &[u32],
    ) -> Option<Arc<PortableFont>> {
        let requested = self
            .find_family_name(&params.family)
            .and_then(|i| self.families[i as usize].closest(params));

        if let Some(font) = requested {
            if codepoints.iter().all(|&cp| font.covers(cp)) {
                return Some(font.clone());
            }
        }

        if let Some(font) = self
            .families
            .iter()
            .find_map(|family| family.closest_covering(params, codepoints))
        {
            return Some(font.clone());
        }

        requested
            .or_else(|| self.families.first().and_then(|f| f.closest(params)))
            .cloned()
    }
}

fn add_simulations(fonts: &mut Vec<PortableFont>) {
    let has_bold = fonts.iter().any(|f| f.weight >= 600);
    let has_slant = fonts.iter().any(|f| f.style != FontStyle::Normal);

    let mut simulated = Vec::new();
    if !has_slant {
        simulated.extend(
            fonts
                .iter()
                .map(|f| PortableFont::simulated(f, Simulations::OBLIQUE)),
        );
    }

    let regular = fonts
        .iter()
        .filter(|f| f.style == FontStyle::Normal)
        .min_by_key(|f| {
            (
                f.record.stretch != FontStretch::Normal,
                (f.weight as i32 - 400).unsigned_abs(),
            )
        });
    if let (false, Some(regular)) = (has_bold, regular) {
        simulated.push(PortableFont::simulated(regular, Simulations::BOLD));
        if !has_slant {
            simulated.push(PortableFont::simulated(
                regular,
                Simulations::BOLD | Simulations::OBLIQUE,
            ));
        }
    }
    fonts.extend(simulated);
}

impl FontCollection for PortableCollection {
    fn family_count(&self) -> u32 {
        self.families.len() as u32
    }

    fn family(&self, index: u32) -> Result<Handle<dyn FontFamily>, HostError> {
        let family = self
            .families
            .get(index as usize)
            .ok_or(HostError::OutOfRange {
                index,
                count: self.family_count(),
            })?;
        Ok(Handle::from_arc(family.clone() as Arc<dyn FontFamily>))
    }

    fn find_family_name(&self, name: &str) -> Option<u32> {
        self.families
            .iter()
            .position(|family| family.matches_name(name))
            .map(|i| i as u32)
    }

    fn font_from_font_face(&self, face: &dyn FontFace) -> Result<Handle<dyn Font>, HostError> {
        let files = face.files()?;
        let file = files.first().ok_or(HostError::FontNotFound)?;
        let key = file.reference_key()?;
        let index = face.index();
        let simulations = face.simulations();

        self.families
            .iter()
            .flat_map(|family| family.fonts.iter())
            .find(|font| {
                font.record.key == key
                    && font.record.index == index
                    && font.simulations == simulations
            })
            .map(|font| Handle::from_arc(font.clone() as Arc<dyn Font>))
            .ok_or(HostError::FontNotFound)
    }
}
