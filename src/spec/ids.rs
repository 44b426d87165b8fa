use ahash::AHashSet;

/// Prefix shared by every generated screen identifier.
pub const SCREEN_ID_PREFIX: &str = "SCREEN_";

/// Converts a zero-based counter into bijective base-26 letters (0 -> A, 25 -> Z, 26 -> AA).
pub fn letters_for_index(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Builds the screen id for a counter value, e.g. `SCREEN_C` for 2.
pub fn screen_id_for_index(index: usize) -> String {
    format!("{}{}", SCREEN_ID_PREFIX, letters_for_index(index))
}

/// Returns the first generated screen id that is not already taken.
pub fn next_screen_id<'a, I>(taken: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let taken: AHashSet<&str> = taken.into_iter().collect();
    (0..)
        .map(screen_id_for_index)
        .find(|candidate| !taken.contains(candidate.as_str()))
        .unwrap_or_else(|| screen_id_for_index(taken.len()))
}

/// Normalizes a free-form string into an identifier-safe field name.
///
/// Lowercases, maps every character outside `[a-z0-9]` to `_`, collapses runs of
/// underscores, trims them from both ends and prefixes `field_` when the result
/// would start with a digit. Returns an empty string when nothing usable remains.
pub fn sanitize_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.trim().chars().flat_map(char::to_lowercase) {
        let mapped = match ch {
            'a'..='z' | '0'..='9' => ch,
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            'ñ' => 'n',
            _ => '_',
        };
        if mapped == '_' && (out.is_empty() || out.ends_with('_')) {
            continue;
        }
        out.push(mapped);
    }
    while out.ends_with('_') {
        out.pop();
    }
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert_str(0, "field_");
    }
    out
}

/// Appends `_2`, `_3`, ... to `base` until the name is not in `taken`.
pub fn unique_name(base: &str, taken: &AHashSet<String>) -> String {
    if !taken.contains(base) {
        return base.to_string();
    }
    (2..)
        .map(|n| format!("{}_{}", base, n))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| base.to_string())
}

/// Extracts `<key>` from a `${data.<key>}` binding expression.
pub fn data_binding_key(text: &str) -> Option<&str> {
    let inner = text.trim().strip_prefix("${data.")?.strip_suffix('}')?;
    if inner.is_empty() || !inner.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }
    Some(inner)
}
