/// Buffer size, in UTF-16 units including the terminator, for names read
/// from the host.
pub const NAME_MAX_LENGTH: usize = 256;
/// Smallest usable name buffer: one unit of text and the terminator.
pub const NAME_MIN_LENGTH: usize = 2;

/// Family requested for fallback layouts when the caller names none.
pub const FALLBACK_DEFAULT_FONT: &str = "Arial";

/// Longest private font directory path accepted, in bytes.
pub const MAX_DIR_PATH_LENGTH: usize = 32000;

// Fallback text format
pub const FALLBACK_FONT_WEIGHT: u16 = 500;
pub const FALLBACK_FONT_SIZE: f32 = 1.0;
pub const FALLBACK_LOCALE: &str = "";

// Portable host
pub const MAX_FONT_DIR_DEPTH: usize = 8;
pub const FONT_FILE_EXTENSIONS: &[&str] = &["ttf", "otf", "ttc", "otc"];
