//! In-memory host used by unit tests. Every object it creates is recorded
//! in a [`Ledger`] so tests can check that nothing leaks and that objects
//! are released in the expected order.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, Weak};
use std::time::SystemTime;

use crate::handle::Handle;
use crate::host::{
    CollectionLoader, Factory, FaceType, FileFragment, Font, FontCollection, FontFace,
    FontFamily, FontFile, FontFileLoader, FontFileStream, FontStretch, FontStyle, GlyphRun,
    Host, HostError, InformationalStringId, LocalizedString, LocalizedStrings, MeasuringMode,
    Simulations, TextFormat, TextFormatParams, TextLayout, TextRenderer,
};

#[derive(Default)]
pub(crate) struct Ledger {
    counts: Mutex<HashMap<&'static str, (usize, usize)>>,
    drops: Mutex<Vec<&'static str>>,
    events: Mutex<Vec<String>>,
}

impl Ledger {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn created(&self, kind: &'static str) {
        self.counts.lock().unwrap().entry(kind).or_default().0 += 1;
    }

    fn dropped(&self, kind: &'static str) {
        self.counts.lock().unwrap().entry(kind).or_default().1 += 1;
        self.drops.lock().unwrap().push(kind);
    }

    pub(crate) fn record(&self, event: impl Into<String>) {
        self.events.lock().unwrap().push(event.into());
    }

    pub(crate) fn created_count(&self, kind: &str) -> usize {
        self.counts.lock().unwrap().get(kind).map_or(0, |c| c.0)
    }

    pub(crate) fn live(&self, kind: &str) -> usize {
        self.counts
            .lock()
            .unwrap()
            .get(kind)
            .map_or(0, |(created, dropped)| created - dropped)
    }

    pub(crate) fn total_live(&self) -> usize {
        self.counts
            .lock()
            .unwrap()
            .values()
            .map(|(created, dropped)| created - dropped)
            .sum()
    }

    pub(crate) fn drop_order(&self) -> Vec<&'static str> {
        self.drops.lock().unwrap().clone()
    }

    pub(crate) fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

struct Tracked {
    ledger: Arc<Ledger>,
    kind: &'static str,
}

impl Tracked {
    fn new(ledger: &Arc<Ledger>, kind: &'static str) -> Self {
        ledger.created(kind);
        Self {
            ledger: ledger.clone(),
            kind,
        }
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.ledger.dropped(self.kind);
    }
}

/// Builds a reference key in the local loader layout.
pub(crate) fn mock_key(path: &str) -> Vec<u8> {
    let mut key = vec![0u8; 8];
    for unit in path.encode_utf16() {
        key.extend_from_slice(&unit.to_le_bytes());
    }
    key
}

#[derive(Debug, Clone)]
pub(crate) struct MockFontSpec {
    pub win32_family: Vec<String>,
    pub full_names: Vec<String>,
    pub postscript: Option<String>,
    pub weight: u16,
    pub stretch: FontStretch,
    pub style: FontStyle,
    pub simulations: Simulations,
    pub face_type: FaceType,
    pub chars: Vec<u32>,
    pub data: Vec<u8>,
    pub key: Vec<u8>,
    pub index: u32,
    pub fail_face: bool,
    pub fail_stream: bool,
}

impl MockFontSpec {
    pub(crate) fn new(family: &str) -> Self {
        Self {
            win32_family: vec![family.to_owned()],
            full_names: vec![format!("{} Regular", family)],
            postscript: Some(family.replace(' ', "")),
            weight: 400,
            stretch: FontStretch::Normal,
            style: FontStyle::Normal,
            simulations: Simulations::empty(),
            face_type: FaceType::TrueType,
            chars: ('A'..='Z').map(|c| c as u32).collect(),
            data: b"0123456789abcdef".to_vec(),
            key: mock_key(&format!("C:\\Fonts\\{}.ttf", family.replace(' ', ""))),
            index: 0,
            fail_face: false,
            fail_stream: false,
        }
    }

    pub(crate) fn weight(mut self, weight: u16) -> Self {
        self.weight = weight;
        self
    }

    pub(crate) fn style(mut self, style: FontStyle) -> Self {
        self.style = style;
        self
    }

    pub(crate) fn stretch(mut self, stretch: FontStretch) -> Self {
        self.stretch = stretch;
        self
    }

    pub(crate) fn simulated(mut self, simulations: Simulations) -> Self {
        self.simulations = simulations;
        self
    }

    pub(crate) fn face_type(mut self, face_type: FaceType) -> Self {
        self.face_type = face_type;
        self
    }

    pub(crate) fn chars(mut self, chars: &[u32]) -> Self {
        self.chars = chars.to_vec();
        self
    }

    pub(crate) fn key(mut self, key: Vec<u8>) -> Self {
        self.key = key;
        self
    }

    pub(crate) fn no_win32_family(mut self) -> Self {
        self.win32_family.clear();
        self
    }

    pub(crate) fn failing_face(mut self) -> Self {
        self.fail_face = true;
        self
    }

    pub(crate) fn failing_stream(mut self) -> Self {
        self.fail_stream = true;
        self
    }
}

#[derive(Debug, Clone)]
pub(crate) struct MockFamilySpec {
    pub names: Vec<String>,
    pub fonts: Vec<Arc<MockFontSpec>>,
}

impl MockFamilySpec {
    pub(crate) fn new(name: &str, fonts: Vec<MockFontSpec>) -> Self {
        Self {
            names: vec![name.to_owned()],
            fonts: fonts.into_iter().map(Arc::new).collect(),
        }
    }
}

/// What the mock service contains and which of its operations fail.
#[derive(Clone, Default)]
pub(crate) struct MockWorld {
    pub system: Vec<MockFamilySpec>,
    pub custom: Vec<MockFamilySpec>,
    /// Font the layout oracle picks, by (family, font) index into `system`.
    pub layout_pick: Option<(usize, usize)>,
    pub fail_factory: bool,
    pub fail_register: bool,
    pub fail_custom: bool,
    pub fail_system: bool,
    pub fail_text_format: bool,
    pub fail_layout: bool,
}

pub(crate) struct MockHost {
    pub ledger: Arc<Ledger>,
    pub world: MockWorld,
}

impl MockHost {
    pub(crate) fn new(world: MockWorld) -> Self {
        Self {
            ledger: Ledger::new(),
            world,
        }
    }
}

impl Host for MockHost {
    fn create_factory(&self) -> Result<Handle<dyn Factory>, HostError> {
        if self.world.fail_factory {
            return Err(HostError::Unavailable("mock".to_owned()));
        }
        let factory = MockFactory::new(self.world.clone(), &self.ledger);
        Ok(Handle::from_arc(factory as Arc<dyn Factory>))
    }
}

pub(crate) struct MockFactory {
    this: Weak<MockFactory>,
    world: MockWorld,
    ledger: Arc<Ledger>,
    loaders: Mutex<Vec<Handle<dyn CollectionLoader>>>,
    _tracked: Tracked,
}

impl MockFactory {
    pub(crate) fn new(world: MockWorld, ledger: &Arc<Ledger>) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            world,
            ledger: ledger.clone(),
            loaders: Mutex::new(Vec::new()),
            _tracked: Tracked::new(ledger, "factory"),
        })
    }

    pub(crate) fn registered_loaders(&self) -> usize {
        self.loaders.lock().unwrap().len()
    }

    fn collection(&self, families: &[MockFamilySpec]) -> Handle<dyn FontCollection> {
        let collection = MockCollection {
            families: families.to_vec(),
            ledger: self.ledger.clone(),
            _tracked: Tracked::new(&self.ledger, "collection"),
        };
        Handle::from_arc(Arc::new(collection) as Arc<dyn FontCollection>)
    }
}

impl Factory for MockFactory {
    fn system_font_collection(&self) -> Result<Handle<dyn FontCollection>, HostError> {
        if self.world.fail_system {
            return Err(HostError::Fail("system collection".to_owned()));
        }
        Ok(self.collection(&self.world.system))
    }

    fn register_collection_loader(
        &self,
        loader: Handle<dyn CollectionLoader>,
    ) -> Result<(), HostError> {
        if self.world.fail_register {
            return Err(HostError::Fail("register".to_owned()));
        }
        self.ledger.record("register");
        self.loaders.lock().unwrap().push(loader);
        Ok(())
    }

    fn unregister_collection_loader(
        &self,
        loader: &Handle<dyn CollectionLoader>,
    ) -> Result<(), HostError> {
        let mut loaders = self.loaders.lock().unwrap();
        let position = loaders
            .iter()
            .position(|l| Handle::ptr_eq(l, loader))
            .ok_or(HostError::NotRegistered)?;
        loaders.remove(position);
        self.ledger.record("unregister");
        Ok(())
    }

    fn create_custom_collection(
        &self,
        loader: &Handle<dyn CollectionLoader>,
        key: &[u8],
    ) -> Result<Handle<dyn FontCollection>, HostError> {
        if self.world.fail_custom {
            return Err(HostError::Fail("custom collection".to_owned()));
        }
        let this = self.this.upgrade().ok_or(HostError::NotRegistered)?;
        let enumerator = loader.create_enumerator(Handle::from_arc(this as Arc<dyn Factory>), key)?;
        let mut files = 0;
        while let Ok(true) = enumerator.move_next() {
            if enumerator.current_font_file().is_ok() {
                files += 1;
            }
        }
        self.ledger.record(format!("enumerated {}", files));
        Ok(self.collection(&self.world.custom))
    }

    fn create_font_file_reference(
        &self,
        path: &Path,
        _last_write_time: Option<SystemTime>,
    ) -> Result<Handle<dyn FontFile>, HostError> {
        let spec = MockFontSpec::new("File").key(mock_key(&path.to_string_lossy()));
        Ok(MockFile::handle(Arc::new(spec), &self.ledger))
    }

    fn create_text_format(
        &self,
        params: TextFormatParams,
    ) -> Result<Handle<dyn TextFormat>, HostError> {
        if self.world.fail_text_format {
            return Err(HostError::Fail("text format".to_owned()));
        }
        let format = MockTextFormat {
            params,
            _tracked: Tracked::new(&self.ledger, "format"),
        };
        Ok(Handle::from_arc(Arc::new(format) as Arc<dyn TextFormat>))
    }

    fn create_text_layout(
        &self,
        text: &[u16],
        format: &Handle<dyn TextFormat>,
        _max_width: f32,
        _max_height: f32,
    ) -> Result<Handle<dyn TextLayout>, HostError> {
        if self.world.fail_layout {
            return Err(HostError::Fail("text layout".to_owned()));
        }
        self.ledger.record(format!(
            "layout {:?} in {}",
            text,
            format.params().family
        ));
        let picked = self
            .world
            .layout_pick
            .and_then(|(family, font)| self.world.system.get(family)?.fonts.get(font).cloned());
        let layout = MockTextLayout {
            picked,
            ledger: self.ledger.clone(),
            _tracked: Tracked::new(&self.ledger, "layout"),
        };
        Ok(Handle::from_arc(Arc::new(layout) as Arc<dyn TextLayout>))
    }
}

struct MockCollection {
    families: Vec<MockFamilySpec>,
    ledger: Arc<Ledger>,
    _tracked: Tracked,
}

impl FontCollection for MockCollection {
    fn family_count(&self) -> u32 {
        self.families.len() as u32
    }

    fn family(&self, index: u32) -> Result<Handle<dyn FontFamily>, HostError> {
        let spec = self
            .families
            .get(index as usize)
            .ok_or(HostError::OutOfRange {
                index,
                count: self.family_count(),
            })?;
        let family = MockFamily {
            spec: spec.clone(),
            ledger: self.ledger.clone(),
            _tracked: Tracked::new(&self.ledger, "family"),
        };
        Ok(Handle::from_arc(Arc::new(family) as Arc<dyn FontFamily>))
    }

    fn find_family_name(&self, name: &str) -> Option<u32> {
        self.families
            .iter()
            .position(|f| f.names.iter().any(|n| n.eq_ignore_ascii_case(name)))
            .map(|i| i as u32)
    }

    fn font_from_font_face(&self, face: &dyn FontFace) -> Result<Handle<dyn Font>, HostError> {
        let files = face.files()?;
        let key = files
            .first()
            .ok_or(HostError::FontNotFound)?
            .reference_key()?
            .to_vec();
        self.families
            .iter()
            .flat_map(|f| f.fonts.iter())
            .find(|spec| {
                spec.key == key
                    && spec.index == face.index()
                    && spec.simulations == face.simulations()
            })
            .map(|spec| MockFont::handle(spec.clone(), &self.ledger))
            .ok_or(HostError::FontNotFound)
    }
}

struct MockFamily {
    spec: MockFamilySpec,
    ledger: Arc<Ledger>,
    _tracked: Tracked,
}

impl FontFamily for MockFamily {
    fn font_count(&self) -> u32 {
        self.spec.fonts.len() as u32
    }

    fn font(&self, index: u32) -> Result<Handle<dyn Font>, HostError> {
        let spec = self
            .spec
            .fonts
            .get(index as usize)
            .ok_or(HostError::OutOfRange {
                index,
                count: self.font_count(),
            })?;
        Ok(MockFont::handle(spec.clone(), &self.ledger))
    }

    fn family_names(&self) -> Result<LocalizedStrings, HostError> {
        Ok(strings(&self.spec.names))
    }
}

fn strings(values: &[String]) -> LocalizedStrings {
    LocalizedStrings::new(
        values
            .iter()
            .map(|v| LocalizedString {
                locale: "en-us".into(),
                value: v.clone(),
            })
            .collect(),
    )
}

struct MockFont {
    spec: Arc<MockFontSpec>,
    ledger: Arc<Ledger>,
    _tracked: Tracked,
}

impl MockFont {
    fn handle(spec: Arc<MockFontSpec>, ledger: &Arc<Ledger>) -> Handle<dyn Font> {
        let font = MockFont {
            spec,
            ledger: ledger.clone(),
            _tracked: Tracked::new(ledger, "font"),
        };
        Handle::from_arc(Arc::new(font) as Arc<dyn Font>)
    }
}

impl Font for MockFont {
    fn weight(&self) -> u16 {
        self.spec.weight
    }

    fn stretch(&self) -> FontStretch {
        self.spec.stretch
    }

    fn style(&self) -> FontStyle {
        self.spec.style
    }

    fn simulations(&self) -> Simulations {
        self.spec.simulations
    }

    fn informational_strings(
        &self,
        id: InformationalStringId,
    ) -> Result<Option<LocalizedStrings>, HostError> {
        let values = match id {
            InformationalStringId::Win32FamilyNames => self.spec.win32_family.clone(),
            InformationalStringId::FullName => self.spec.full_names.clone(),
            InformationalStringId::PostscriptName => {
                self.spec.postscript.iter().cloned().collect()
            }
            _ => Vec::new(),
        };
        Ok((!values.is_empty()).then(|| strings(&values)))
    }

    fn has_character(&self, codepoint: u32) -> Result<bool, HostError> {
        self.ledger.record(format!("has_character {:#x}", codepoint));
        Ok(self.spec.chars.contains(&codepoint))
    }

    fn create_font_face(&self) -> Result<Handle<dyn FontFace>, HostError> {
        if self.spec.fail_face {
            return Err(HostError::Fail("face".to_owned()));
        }
        Ok(MockFace::handle(self.spec.clone(), &self.ledger))
    }
}

struct MockFace {
    spec: Arc<MockFontSpec>,
    ledger: Arc<Ledger>,
    _tracked: Tracked,
}

impl MockFace {
    fn new(spec: Arc<MockFontSpec>, ledger: &Arc<Ledger>) -> Self {
        Self {
            spec,
            ledger: ledger.clone(),
            _tracked: Tracked::new(ledger, "face"),
        }
    }

    fn handle(spec: Arc<MockFontSpec>, ledger: &Arc<Ledger>) -> Handle<dyn FontFace> {
        Handle::from_arc(Arc::new(Self::new(spec, ledger)) as Arc<dyn FontFace>)
    }
}

impl FontFace for MockFace {
    fn face_type(&self) -> FaceType {
        self.spec.face_type
    }

    fn files(&self) -> Result<Vec<Handle<dyn FontFile>>, HostError> {
        Ok(vec![MockFile::handle(self.spec.clone(), &self.ledger)])
    }

    fn index(&self) -> u32 {
        self.spec.index
    }

    fn simulations(&self) -> Simulations {
        self.spec.simulations
    }
}

struct MockFile {
    spec: Arc<MockFontSpec>,
    ledger: Arc<Ledger>,
    _tracked: Tracked,
}

impl MockFile {
    fn handle(spec: Arc<MockFontSpec>, ledger: &Arc<Ledger>) -> Handle<dyn FontFile> {
        let file = MockFile {
            spec,
            ledger: ledger.clone(),
            _tracked: Tracked::new(ledger, "file"),
        };
        Handle::from_arc(Arc::new(file) as Arc<dyn FontFile>)
    }
}

impl FontFile for MockFile {
    fn reference_key(&self) -> Result<&[u8], HostError> {
        Ok(&self.spec.key)
    }

    fn loader(&self) -> Result<Handle<dyn FontFileLoader>, HostError> {
        let loader = MockLoader {
            spec: self.spec.clone(),
            ledger: self.ledger.clone(),
            _tracked: Tracked::new(&self.ledger, "loader"),
        };
        Ok(Handle::from_arc(Arc::new(loader) as Arc<dyn FontFileLoader>))
    }
}

struct MockLoader {
    spec: Arc<MockFontSpec>,
    ledger: Arc<Ledger>,
    _tracked: Tracked,
}

impl FontFileLoader for MockLoader {
    fn create_stream_from_key(&self, _key: &[u8]) -> Result<Handle<dyn FontFileStream>, HostError> {
        if self.spec.fail_stream {
            return Err(HostError::Fail("stream".to_owned()));
        }
        let stream = MockStream {
            spec: self.spec.clone(),
            _tracked: Tracked::new(&self.ledger, "stream"),
        };
        Ok(Handle::from_arc(Arc::new(stream) as Arc<dyn FontFileStream>))
    }
}

struct MockStream {
    spec: Arc<MockFontSpec>,
    _tracked: Tracked,
}

impl FontFileStream for MockStream {
    fn file_size(&self) -> Result<u64, HostError> {
        Ok(self.spec.data.len() as u64)
    }

    fn read_fragment(&self, offset: u64, length: u64) -> Result<FileFragment<'_>, HostError> {
        let start = usize::try_from(offset).map_err(|_| HostError::InvalidArgument)?;
        let len = usize::try_from(length).map_err(|_| HostError::InvalidArgument)?;
        let end = start.checked_add(len).ok_or(HostError::InvalidArgument)?;
        self.spec
            .data
            .get(start..end)
            .map(FileFragment::borrowed)
            .ok_or(HostError::InvalidArgument)
    }
}

struct MockTextFormat {
    params: TextFormatParams,
    _tracked: Tracked,
}

impl TextFormat for MockTextFormat {
    fn params(&self) -> &TextFormatParams {
        &self.params
    }
}

struct MockTextLayout {
    picked: Option<Arc<MockFontSpec>>,
    ledger: Arc<Ledger>,
    _tracked: Tracked,
}

impl TextLayout for MockTextLayout {
    fn draw(
        &self,
        renderer: &dyn TextRenderer,
        origin_x: f32,
        origin_y: f32,
    ) -> Result<(), HostError> {
        let _ = renderer.is_pixel_snapping_disabled();
        let _ = renderer.pixels_per_dip();
        if let Some(spec) = &self.picked {
            let face = MockFace::new(spec.clone(), &self.ledger);
            let run = GlyphRun {
                font_face: &face,
                font_em_size: 1.0,
                glyph_count: 1,
                is_sideways: false,
                bidi_level: 0,
            };
            renderer.draw_glyph_run((origin_x, origin_y), MeasuringMode::Natural, &run)?;
        }
        Ok(())
    }
}
