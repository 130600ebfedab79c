//! Deterministic output file names for synthesized text.
//!
//! Names are not collision-free: two texts that agree on their first
//! `MAX_NAME_BYTES` bytes (after substitution) map to the same file and the
//! later item overwrites the earlier one.

/// Extension of the media files the engine writes.
pub const MEDIA_EXTENSION: &str = "mp3";

/// Upper bound on the base name in UTF-8 bytes, which also bounds it in
/// characters. Keeps CJK names well under the 255-byte file name limit.
pub const MAX_NAME_BYTES: usize = 128;

const RESERVED: [char; 10] = [' ', '/', '\\', '?', '*', ':', '<', '>', '|', '"'];

pub fn derive_file_name(text: &str) -> String {
    let mut name = String::with_capacity(MAX_NAME_BYTES + MEDIA_EXTENSION.len() + 1);
    for c in text.chars() {
        if name.len() + c.len_utf8() > MAX_NAME_BYTES {
            break;
        }
        name.push(if RESERVED.contains(&c) { '_' } else { c });
    }
    name.push('.');
    name.push_str(MEDIA_EXTENSION);
    name
}
