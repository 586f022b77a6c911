//! A font service written in pure Rust.
//!
//! Fonts are discovered by walking font directories, parsed with `skrifa`,
//! and grouped into families the way a platform service would group them,
//! including synthesized bold and oblique variants. Text layout picks one
//! font for the whole string.

mod collection;
mod file;
mod layout;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, PoisonError, Weak};
use std::time::SystemTime;

use crate::config::HostSettings;
use crate::constants::{FONT_FILE_EXTENSIONS, MAX_FONT_DIR_DEPTH};
use crate::handle::Handle;
use crate::host::{
    CollectionLoader, Factory, FontCollection, FontFile, FontFileLoader, Host, HostError,
    TextFormat, TextFormatParams, TextLayout,
};

use collection::{parse_faces, FaceRecord, PortableCollection};
use file::{LocalFileLoader, LocalFontFile};
use layout::{PortableTextFormat, PortableTextLayout};

pub struct PortableHost {
    font_dirs: Vec<PathBuf>,
}

impl PortableHost {
    /// A host whose system collection is built from exactly `font_dirs`.
    pub fn new(font_dirs: Vec<PathBuf>) -> Self {
        Self { font_dirs }
    }

    pub fn from_settings(settings: &HostSettings) -> Self {
        let mut font_dirs = Vec::new();
        if settings.include_system_dirs {
            font_dirs.extend(default_font_dirs());
        }
        for dir in &settings.font_dirs {
            if !font_dirs.contains(dir) {
                font_dirs.push(dir.clone());
            }
        }
        Self { font_dirs }
    }

    pub fn font_dirs(&self) -> &[PathBuf] {
        &self.font_dirs
    }
}

impl Host for PortableHost {
    fn create_factory(&self) -> Result<Handle<dyn Factory>, HostError> {
        let factory = PortableFactory::new(self.font_dirs.clone());
        Ok(Handle::from_arc(factory as Arc<dyn Factory>))
    }
}

/// Font directories of the running platform, followed by the user's.
pub fn default_font_dirs() -> Vec<PathBuf> {
    let mut dirs_found = platform_font_dirs();
    if let Some(user_dir) = dirs::font_dir() {
        if !dirs_found.contains(&user_dir) {
            dirs_found.push(user_dir);
        }
    }
    dirs_found
}

#[cfg(target_os = "windows")]
fn platform_font_dirs() -> Vec<PathBuf> {
    let windir = std::env::var_os("WINDIR").unwrap_or_else(|| "C:\\Windows".into());
    vec![PathBuf::from(windir).join("Fonts")]
}

#[cfg(target_os = "macos")]
fn platform_font_dirs() -> Vec<PathBuf> {
    vec![
        PathBuf::from("/System/Library/Fonts"),
        PathBuf::from("/Library/Fonts"),
    ]
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn platform_font_dirs() -> Vec<PathBuf> {
    vec![
        PathBuf::from("/usr/share/fonts"),
        PathBuf::from("/usr/local/share/fonts"),
    ]
}

pub struct PortableFactory {
    this: Weak<PortableFactory>,
    font_dirs: Vec<PathBuf>,
    file_loader: Handle<dyn FontFileLoader>,
    system: OnceLock<Arc<PortableCollection>>,
    loaders: Mutex<Vec<Handle<dyn CollectionLoader>>>,
}

impl PortableFactory {
    fn new(font_dirs: Vec<PathBuf>) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            font_dirs,
            file_loader: Handle::from_arc(Arc::new(LocalFileLoader) as Arc<dyn FontFileLoader>),
            system: OnceLock::new(),
            loaders: Mutex::new(Vec::new()),
        })
    }

    fn system(&self) -> Arc<PortableCollection> {
        self.system
            .get_or_init(|| Arc::new(self.build_system_collection()))
            .clone()
    }

    fn build_system_collection(&self) -> PortableCollection {
        let mut paths = Vec::new();
        for dir in &self.font_dirs {
            collect_font_files(dir, 0, &mut paths);
        }
        paths.sort();
        paths.dedup();

        let mut records = Vec::new();
        for path in &paths {
            let mtime = fs::metadata(path).and_then(|m| m.modified()).ok();
            let file = self.local_file(path, mtime);
            match parse_faces(&file) {
                Ok(faces) => records.extend(faces),
                Err(e) => log::debug!("Skipping font file {}: {}", path.display(), e),
            }
        }
        log::debug!(
            "System collection: {} faces from {} files",
            records.len(),
            paths.len()
        );
        PortableCollection::build(records)
    }

    fn local_file(&self, path: &Path, mtime: Option<SystemTime>) -> Handle<dyn FontFile> {
        let file = LocalFontFile::new(path, mtime, self.file_loader.clone());
        Handle::from_arc(Arc::new(file) as Arc<dyn FontFile>)
    }

    fn self_handle(&self) -> Result<Handle<dyn Factory>, HostError> {
        let this = self
            .this
            .upgrade()
            .ok_or_else(|| HostError::Unavailable("factory is shutting down".to_owned()))?;
        Ok(Handle::from_arc(this as Arc<dyn Factory>))
    }

    fn is_registered(&self, loader: &Handle<dyn CollectionLoader>) -> bool {
        self.loaders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|l| Handle::ptr_eq(l, loader))
    }
}

fn collect_font_files(dir: &Path, depth: usize, out: &mut Vec<PathBuf>) {
    if depth > MAX_FONT_DIR_DEPTH {
        return;
    }
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            log::debug!("Cannot list font directory {}: {}", dir.display(), e);
            return;
        }
    };
    for entry in entries.flatten() {
        let path = entry.path();
        match entry.file_type() {
            Ok(ft) if ft.is_dir() => collect_font_files(&path, depth + 1, out),
            Ok(_) if has_font_extension(&path) => out.push(path),
            _ => {}
        }
    }
}

fn has_font_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            FONT_FILE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

impl Factory for PortableFactory {
    fn system_font_collection(&self) -> Result<Handle<dyn FontCollection>, HostError> {
        Ok(Handle::from_arc(self.system() as Arc<dyn FontCollection>))
    }

    fn register_collection_loader(
        &self,
        loader: Handle<dyn CollectionLoader>,
    ) -> Result<(), HostError> {
        let mut loaders = self.loaders.lock().unwrap_or_else(PoisonError::into_inner);
        if loaders.iter().any(|l| Handle::ptr_eq(l, &loader)) {
            return Err(HostError::AlreadyRegistered);
        }
        loaders.push(loader);
        Ok(())
    }

    fn unregister_collection_loader(
        &self,
        loader: &Handle<dyn CollectionLoader>,
    ) -> Result<(), HostError> {
        let mut loaders = self.loaders.lock().unwrap_or_else(PoisonError::into_inner);
        let position = loaders
            .iter()
            .position(|l| Handle::ptr_eq(l, loader))
            .ok_or(HostError::NotRegistered)?;
        loaders.remove(position);
        Ok(())
    }

    fn create_custom_collection(
        &self,
        loader: &Handle<dyn CollectionLoader>,
        key: &[u8],
    ) -> Result<Handle<dyn FontCollection>, HostError> {
        if !self.is_registered(loader) {
            return Err(HostError::NotRegistered);
        }

        let enumerator = loader.create_enumerator(self.self_handle()?, key)?;
        let mut records: Vec<FaceRecord> = Vec::new();
        loop {
            match enumerator.move_next() {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => {
                    log::warn!("Font file enumeration stopped: {}", e);
                    break;
                }
            }
            let parsed = enumerator
                .current_font_file()
                .and_then(|file| parse_faces(&file));
            match parsed {
                Ok(faces) => records.extend(faces),
                Err(e) => log::debug!("Skipping enumerated font file: {}", e),
            }
        }

        let collection = PortableCollection::build(records);
        Ok(Handle::from_arc(Arc::new(collection) as Arc<dyn FontCollection>))
    }

    fn create_font_file_reference(
        &self,
        path: &Path,
        last_write_time: Option<SystemTime>,
    ) -> Result<Handle<dyn FontFile>, HostError> {
        let metadata = fs::metadata(path)?;
        if !metadata.is_file() {
            return Err(HostError::InvalidArgument);
        }
        let mtime = last_write_time.or_else(|| metadata.modified().ok());
        Ok(self.local_file(path, mtime))
    }

    fn create_text_format(
        &self,
        params: TextFormatParams,
    ) -> Result<Handle<dyn TextFormat>, HostError> {
        if !(params.size > 0.0) {
            return Err(HostError::InvalidArgument);
        }
        Ok(Handle::from_arc(
            Arc::new(PortableTextFormat::new(params)) as Arc<dyn TextFormat>
        ))
    }

    fn create_text_layout(
        &self,
        text: &[u16],
        format: &Handle<dyn TextFormat>,
        max_width: f32,
        max_height: f32,
    ) -> Result<Handle<dyn TextLayout>, HostError> {
        if max_width < 0.0 || max_height < 0.0 {
            return Err(HostError::InvalidArgument);
        }
        let layout = PortableTextLayout::new(text, format.params().clone(), self.system());
        Ok(Handle::from_arc(Arc::new(layout) as Arc<dyn TextLayout>))
    }
}
