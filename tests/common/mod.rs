//! Builds small but well-formed fonts for integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use write_fonts::tables::cmap::Cmap;
use write_fonts::tables::name::{Name, NameRecord};
use write_fonts::tables::os2::{Os2, SelectionFlags};
use write_fonts::types::{GlyphId, NameId, Tag};
use write_fonts::FontBuilder;

const WINDOWS_PLATFORM: u16 = 3;
const WINDOWS_UNICODE_BMP: u16 = 1;
const ENGLISH_US: u16 = 0x0409;

pub struct TestFont {
    pub family: String,
    pub subfamily: String,
    pub weight: u16,
    pub width_class: u16,
    pub italic: bool,
    pub cff: bool,
    pub chars: Vec<u32>,
}

impl TestFont {
    pub fn new(family: &str) -> Self {
        Self {
            family: family.to_owned(),
            subfamily: "Regular".to_owned(),
            weight: 400,
            width_class: 5,
            italic: false,
            cff: false,
            chars: ('A'..='Z').chain('a'..='z').map(|c| c as u32).collect(),
        }
    }

    pub fn bold(mut self) -> Self {
        self.weight = 700;
        self.subfamily = "Bold".to_owned();
        self
    }

    pub fn italic(mut self) -> Self {
        self.italic = true;
        self.subfamily = "Italic".to_owned();
        self
    }

    pub fn cff(mut self) -> Self {
        self.cff = true;
        self
    }

    pub fn width_class(mut self, class: u16) -> Self {
        self.width_class = class;
        self
    }

    pub fn chars(mut self, chars: &[u32]) -> Self {
        self.chars = chars.to_vec();
        self
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.family, self.subfamily)
    }

    pub fn postscript_name(&self) -> String {
        format!("{}-{}", self.family.replace(' ', ""), self.subfamily)
    }

    pub fn build(&self) -> Vec<u8> {
        let mut builder = FontBuilder::new();
        builder
            .add_table(&self.os2())
            .unwrap()
            .add_table(&self.cmap())
            .unwrap()
            .add_table(&self.name())
            .unwrap();
        // Outline tables are only checked for presence.
        if self.cff {
            builder.add_raw(Tag::new(b"CFF "), vec![1u8, 0, 4, 1]);
        } else {
            builder.add_raw(Tag::new(b"glyf"), vec![0u8; 4]);
        }
        builder.build()
    }

    pub fn write_to(&self, dir: &Path, file_name: &str) -> PathBuf {
        let path = dir.join(file_name);
        fs::write(&path, self.build()).unwrap();
        path
    }

    fn os2(&self) -> Os2 {
        Os2 {
            us_weight_class: self.weight,
            us_width_class: self.width_class,
            fs_selection: if self.italic {
                SelectionFlags::ITALIC
            } else {
                SelectionFlags::REGULAR
            },
            ..Default::default()
        }
    }

    fn cmap(&self) -> Cmap {
        let mappings = self
            .chars
            .iter()
            .filter_map(|&cp| char::from_u32(cp))
            .enumerate()
            .map(|(i, ch)| (ch, GlyphId::new(i as u32 + 1)));
        Cmap::from_mappings(mappings).unwrap()
    }

    fn name(&self) -> Name {
        let record = |name_id: u16, value: String| {
            NameRecord::new(
                WINDOWS_PLATFORM,
                WINDOWS_UNICODE_BMP,
                ENGLISH_US,
                NameId::new(name_id),
                value.into(),
            )
        };
        Name::new(vec![
            record(1, self.family.clone()),
            record(2, self.subfamily.clone()),
            record(4, self.full_name()),
            record(6, self.postscript_name()),
        ])
    }
}
