use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "fontbridge")]
#[command(version)]
#[command(about = "Expose host fonts to a font-selection engine", long_about = None)]
#[command(after_help = "\
CODEPOINTS:
    Codepoints may be given as U+4E2D, 0x4E2D, a decimal number, or a
    single character.

LOGGING:
    Set RUST_LOG=debug to see every font that is skipped during a scan.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Config file to use instead of the default location
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Application-private font directory, scanned after the system fonts
    #[arg(long, global = true, value_name = "DIR")]
    pub fonts_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// List registered fonts
    List {
        /// Only fonts of this family
        #[arg(long)]
        family: Option<String>,
    },
    /// Find the font the host would use for a character
    Fallback {
        #[arg(value_parser = parse_codepoint)]
        codepoint: u32,
        /// Family to request
        #[arg(long)]
        family: Option<String>,
    },
    /// Read bytes from a registered font's file
    Read {
        /// Full, PostScript or family name
        name: String,
        #[arg(long, default_value_t = 0)]
        offset: u64,
        /// Number of bytes; without it only the file size is printed
        #[arg(long)]
        length: Option<u64>,
    },
    /// Map a generic family name to a concrete one
    Substitute { name: String },
}

pub fn parse_codepoint(s: &str) -> Result<u32, String> {
    let trimmed = s.trim();
    let hex = trimmed
        .strip_prefix("U+")
        .or_else(|| trimmed.strip_prefix("u+"))
        .or_else(|| trimmed.strip_prefix("0x"))
        .or_else(|| trimmed.strip_prefix("0X"));

    if let Some(hex) = hex {
        return u32::from_str_radix(hex, 16).map_err(|e| format!("invalid codepoint {}: {}", s, e));
    }
    if let Ok(decimal) = trimmed.parse::<u32>() {
        return Ok(decimal);
    }
    let mut chars = trimmed.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c as u32),
        _ => Err(format!("invalid codepoint {}", s)),
    }
}
