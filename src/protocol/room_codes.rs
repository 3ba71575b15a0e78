use rand::RngExt;

/// Characters allowed in room codes: uppercase letters and digits excluding
/// the visually ambiguous `0`, `O`, `I`, `1`.
pub const CODE_ALPHABET: &[u8] = b"23456789ABCDEFGHJKLMNPQRSTUVWXYZ";

/// Generate a room code of the requested length from the clean alphabet.
pub fn generate_room_code_of_length(length: usize) -> String {
    if length == 0 {
        return String::new();
    }
    let mut rng = rand::rng();
    (0..length)
        .map(|_| {
            let idx = rng.random_range(0..CODE_ALPHABET.len());
            // SAFETY: `idx` is produced by `random_range(0..len)`, so it is
            // always within [0, len).
            #[allow(clippy::indexing_slicing)]
            let ch = CODE_ALPHABET[idx] as char;
            ch
        })
        .collect()
}

/// Generate a room code using the default length.
pub fn generate_room_code() -> String {
    generate_room_code_of_length(super::types::DEFAULT_ROOM_CODE_LENGTH)
}

/// Normalize user-supplied codes for lookup: codes match case-insensitively.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// Whether a character may appear in a generated code.
pub fn is_code_char(c: char) -> bool {
    c.is_ascii() && CODE_ALPHABET.contains(&(c as u8))
}
