//! A minimal engine-side font registry.
//!
//! Keeps the registered fonts with their private records and indexes them
//! by family, full and PostScript name. Lookups are case-insensitive.

use std::collections::HashMap;

use compact_str::CompactString;

use crate::engine::FontRegistry;
use crate::provider::{FontMetadata, FontPrivate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FontId(usize);

pub struct CatalogEntry {
    pub metadata: FontMetadata,
    pub path: Option<String>,
    pub index: u32,
    pub private: FontPrivate,
}

#[derive(Default)]
pub struct FontCatalog {
    entries: Vec<Option<CatalogEntry>>,
    by_family: HashMap<CompactString, Vec<FontId>, ahash::RandomState>,
    by_full_name: HashMap<CompactString, Vec<FontId>, ahash::RandomState>,
    by_postscript: HashMap<CompactString, Vec<FontId>, ahash::RandomState>,
}

fn index_key(name: &str) -> CompactString {
    CompactString::from(name.to_lowercase())
}

fn insert_index(
    index: &mut HashMap<CompactString, Vec<FontId>, ahash::RandomState>,
    name: &str,
    id: FontId,
) {
    let ids = index.entry(index_key(name)).or_default();
    if !ids.contains(&id) {
        ids.push(id);
    }
}

fn remove_index(
    index: &mut HashMap<CompactString, Vec<FontId>, ahash::RandomState>,
    name: &str,
    id: FontId,
) {
    let key = index_key(name);
    if let Some(ids) = index.get_mut(&key) {
        ids.retain(|&other| other != id);
        if ids.is_empty() {
            index.remove(&key);
        }
    }
}

impl FontCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, id: FontId) -> Option<&CatalogEntry> {
        self.entries.get(id.0).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: FontId) -> Option<&mut CatalogEntry> {
        self.entries.get_mut(id.0).and_then(Option::as_mut)
    }

    pub fn iter(&self) -> impl Iterator<Item = (FontId, &CatalogEntry)> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.as_ref().map(|e| (FontId(i), e)))
    }

    pub fn find_family(&self, name: &str) -> &[FontId] {
        lookup(&self.by_family, name)
    }

    pub fn find_full_name(&self, name: &str) -> &[FontId] {
        lookup(&self.by_full_name, name)
    }

    pub fn find_postscript(&self, name: &str) -> &[FontId] {
        lookup(&self.by_postscript, name)
    }

    /// Full name, PostScript name, then family.
    pub fn find(&self, name: &str) -> Option<FontId> {
        [
            self.find_full_name(name),
            self.find_postscript(name),
            self.find_family(name),
        ]
        .into_iter()
        .find_map(|ids| ids.first().copied())
    }

    /// Removes a font and releases its private record.
    pub fn remove(&mut self, id: FontId) -> Option<CatalogEntry> {
        let entry = self.entries.get_mut(id.0)?.take()?;
        for name in &entry.metadata.families {
            remove_index(&mut self.by_family, name, id);
        }
        for name in &entry.metadata.full_names {
            remove_index(&mut self.by_full_name, name, id);
        }
        if let Some(name) = &entry.metadata.postscript_name {
            remove_index(&mut self.by_postscript, name, id);
        }
        Some(entry)
    }
}

fn lookup<'a>(
    index: &'a HashMap<CompactString, Vec<FontId>, ahash::RandomState>,
    name: &str,
) -> &'a [FontId] {
    index
        .get(&index_key(name))
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

impl FontRegistry for FontCatalog {
    fn add_font(
        &mut self,
        metadata: &FontMetadata,
        path: Option<&str>,
        index: u32,
        private: FontPrivate,
    ) -> bool {
        if metadata.families.is_empty() {
            log::debug!("Rejecting font without family names");
            return false;
        }

        let id = FontId(self.entries.len());
        for name in &metadata.families {
            insert_index(&mut self.by_family, name, id);
        }
        for name in &metadata.full_names {
            insert_index(&mut self.by_full_name, name, id);
        }
        if let Some(name) = &metadata.postscript_name {
            insert_index(&mut self.by_postscript, name, id);
        }

        self.entries.push(Some(CatalogEntry {
            metadata: metadata.clone(),
            path: path.map(str::to_owned),
            index,
            private,
        }));
        true
    }
}
