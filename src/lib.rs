pub mod catalog;
pub mod cli;
pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod handle;
pub mod host;
pub mod provider;

use log::info;

use crate::catalog::FontCatalog;
use crate::cli::{Cli, Command};
use crate::config::Config;
use crate::engine::FontProviderFuncs;
use crate::host::PortableHost;
use crate::provider::{register_provider, Substitutions};

pub fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    if let Some(dir) = cli.fonts_dir {
        config.provider.fonts_dir = Some(dir);
    }

    if let Command::Substitute { name } = &cli.command {
        let substitutions = Substitutions::with_extra(&config.substitutions);
        match substitutions.lookup(name) {
            Some(family) => println!("{}", family),
            None => return Err(format!("no substitution for {}", name).into()),
        }
        return Ok(());
    }

    let host = PortableHost::from_settings(&config.host);
    let mut catalog = FontCatalog::new();
    let provider = register_provider(&host, &mut catalog, &config)?;
    info!("{} fonts available", catalog.len());

    match cli.command {
        Command::List { family } => {
            let ids: Vec<_> = match &family {
                Some(name) => catalog.find_family(name).to_vec(),
                None => catalog.iter().map(|(id, _)| id).collect(),
            };
            for id in ids {
                let Some(entry) = catalog.get(id) else {
                    continue;
                };
                let meta = &entry.metadata;
                let families: Vec<&str> = meta.families.iter().map(|f| f.as_str()).collect();
                println!(
                    "{}\t{}\tweight={} width={} slant={:?}\t{}",
                    families.join(", "),
                    meta.postscript_name.as_deref().unwrap_or("-"),
                    meta.weight,
                    meta.width,
                    meta.slant,
                    entry.path.as_deref().unwrap_or("-"),
                );
            }
        }
        Command::Fallback { codepoint, family } => {
            match provider.get_fallback(family.as_deref(), codepoint) {
                Some(found) => println!("{}", found),
                None => return Err(format!("no fallback font for U+{:04X}", codepoint).into()),
            }
        }
        Command::Read {
            name,
            offset,
            length,
        } => {
            let id = catalog
                .find(&name)
                .ok_or_else(|| format!("font not found: {}", name))?;
            let entry = catalog
                .get_mut(id)
                .ok_or_else(|| format!("font not found: {}", name))?;
            match length {
                None => {
                    let size = provider.get_data(&mut entry.private, 0, 0, None);
                    if size == 0 {
                        return Err(format!("cannot read {}", name).into());
                    }
                    println!("{}", size);
                }
                Some(length) => {
                    let len = usize::try_from(length)?;
                    let mut buf = vec![0u8; len];
                    let read = provider.get_data(&mut entry.private, offset, length, Some(&mut buf));
                    if read != len {
                        return Err(format!(
                            "cannot read {} bytes at offset {} from {}",
                            length, offset, name
                        )
                        .into());
                    }
                    print_hex(offset, &buf);
                }
            }
        }
        Command::Substitute { .. } => {}
    }

    drop(catalog);
    drop(provider);
    Ok(())
}

fn print_hex(offset: u64, bytes: &[u8]) {
    for (row, chunk) in bytes.chunks(16).enumerate() {
        let hex: Vec<String> = chunk.iter().map(|b| format!("{:02x}", b)).collect();
        println!("{:08x}  {}", offset + (row as u64) * 16, hex.join(" "));
    }
}
