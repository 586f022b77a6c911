//! The font provider: exposes a host's fonts to the font-selection engine.
//!
//! Registration creates a host factory, installs the private-directory
//! collection loader, scans the system collection and then the private
//! collection, and hands every physical font to the engine. Afterwards the
//! engine drives the provider through [`FontProviderFuncs`].

mod enumerator;
mod fallback;
mod font_data;
mod loader;
mod metadata;
mod scan;

use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use enumerator::DirectoryFontEnumerator;
pub use fallback::{encode_utf16, FallbackLogRenderer, FallbackResolver};
pub use font_data::FontPrivate;
pub use loader::LocalCollectionLoader;
pub use metadata::{map_width, FontMetadata, Slant, Substitutions};
pub use scan::{extract_metadata, path_from_reference_key, scan_fonts, ScanSummary};

use crate::config::Config;
use crate::engine::{FontProviderFuncs, FontRegistry};
use crate::error::ProviderError;
use crate::handle::Handle;
use crate::host::{CollectionLoader, Factory, Host};

/// State held for the provider's lifetime. Dropping it unregisters the
/// collection loader and then releases the factory.
///
/// No enumerator handle is kept: the host owns each enumerator the loader
/// creates and releases it before `create_custom_collection` returns.
pub struct ProviderContext {
    factory: Handle<dyn Factory>,
    loader: Handle<dyn CollectionLoader>,
    loader_registered: bool,
    fonts_dir: Option<PathBuf>,
}

impl ProviderContext {
    pub fn factory(&self) -> &Handle<dyn Factory> {
        &self.factory
    }

    pub fn fonts_dir(&self) -> Option<&Path> {
        self.fonts_dir.as_deref()
    }
}

impl Drop for ProviderContext {
    fn drop(&mut self) {
        if self.loader_registered {
            if let Err(e) = self.factory.unregister_collection_loader(&self.loader) {
                log::debug!("Failed to unregister collection loader: {}", e);
            }
        }
    }
}

pub struct HostFontProvider {
    fallback: FallbackResolver,
    substitutions: Substitutions,
    summary: ScanSummary,
    context: ProviderContext,
}

impl HostFontProvider {
    pub fn context(&self) -> &ProviderContext {
        &self.context
    }

    /// Totals over both scan passes.
    pub fn summary(&self) -> ScanSummary {
        self.summary
    }
}

/// Creates the provider and registers every font the host knows with
/// `selector`.
pub fn register_provider(
    host: &dyn Host,
    selector: &mut dyn FontRegistry,
    config: &Config,
) -> Result<HostFontProvider, ProviderError> {
    let settings = &config.provider;
    let name_max_length = settings.effective_name_max_length();

    let factory = host.create_factory().map_err(|e| {
        log::warn!("Failed to initialize font service: {}", e);
        ProviderError::Factory(e)
    })?;

    let loader: Handle<dyn CollectionLoader> =
        Handle::from_arc(Arc::new(LocalCollectionLoader) as Arc<dyn CollectionLoader>);
    let loader_registered = match factory.register_collection_loader(loader.clone()) {
        Ok(()) => true,
        Err(e) if settings.fonts_dir.is_some() => {
            log::warn!("Failed to register font collection loader: {}", e);
            return Err(ProviderError::RegisterLoader(e));
        }
        Err(e) => {
            log::debug!("Collection loader not registered: {}", e);
            false
        }
    };

    let context = ProviderContext {
        factory: factory.clone(),
        loader,
        loader_registered,
        fonts_dir: settings.fonts_dir.clone(),
    };

    let custom = match &context.fonts_dir {
        Some(dir) => {
            let key = LocalCollectionLoader::collection_key(dir);
            let collection = factory
                .create_custom_collection(&context.loader, &key)
                .map_err(|e| {
                    log::warn!("Failed to load fonts from {}: {}", dir.display(), e);
                    ProviderError::CustomCollection(e)
                })?;
            Some(collection)
        }
        None => None,
    };

    let system = factory.system_font_collection().map_err(|e| {
        log::warn!("Failed to open system font collection: {}", e);
        ProviderError::SystemCollection(e)
    })?;

    let mut summary = scan_fonts(&*system, selector, name_max_length);
    log::info!(
        "Registered {} system fonts ({} simulated skipped, {} failed)",
        summary.registered,
        summary.simulated,
        summary.failed
    );
    drop(system);

    if let Some(custom) = custom {
        let private = scan_fonts(&*custom, selector, name_max_length);
        log::info!("Registered {} private fonts", private.registered);
        summary += private;
    }

    Ok(HostFontProvider {
        fallback: FallbackResolver::new(
            factory,
            &settings.fallback_family,
            name_max_length,
        ),
        substitutions: Substitutions::with_extra(&config.substitutions),
        summary,
        context,
    })
}

impl FontProviderFuncs for HostFontProvider {
    fn get_data(
        &self,
        font: &mut FontPrivate,
        offset: u64,
        length: u64,
        out: Option<&mut [u8]>,
    ) -> usize {
        font.read(offset, length, out)
    }

    fn check_postscript(&self, font: &mut FontPrivate) -> bool {
        font.is_postscript_outline()
    }

    fn check_glyph(&self, font: &FontPrivate, codepoint: u32) -> bool {
        font.has_glyph(codepoint)
    }

    fn get_substitutions(&self, name: &str) -> Option<&str> {
        self.substitutions.lookup(name)
    }

    fn get_fallback(&self, family: Option<&str>, codepoint: u32) -> Option<String> {
        self.fallback.resolve(family, codepoint)
    }
}
