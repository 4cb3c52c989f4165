//! Text decoding helpers.

use std::borrow::Cow;

use encoding_rs::Encoding;

/// Decode bytes to a string.
///
/// This function:
/// 1. Uses the declared encoding when it names one encoding_rs knows
/// 2. Otherwise tries UTF-8 (handles BOM automatically via encoding_rs)
/// 3. Falls back to Windows-1252 (superset of ISO-8859-1, common in old
///    Info files)
///
/// Returns `Cow::Borrowed` when the input is valid UTF-8 and no other
/// encoding was declared.
pub fn decode_text<'a>(bytes: &'a [u8], declared: Option<&str>) -> Cow<'a, str> {
    if let Some(encoding) = declared.and_then(lookup_encoding) {
        let (result, _, _) = encoding.decode(bytes);
        return result;
    }

    let (result, _encoding, malformed) = encoding_rs::UTF_8.decode(bytes);
    if !malformed {
        return result;
    }

    let (result, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    result
}

/// Resolve an Emacs-style coding name (`utf-8-unix`, `iso-latin-1`) to an
/// encoding.
pub fn lookup_encoding(name: &str) -> Option<&'static Encoding> {
    let name = name.trim().to_ascii_lowercase();
    let base = ["-unix", "-dos", "-mac"]
        .iter()
        .find_map(|eol| name.strip_suffix(eol))
        .unwrap_or(&name);

    let label = match base {
        "iso-latin-1" => "iso-8859-1",
        "iso-latin-2" => "iso-8859-2",
        "iso-latin-9" => "iso-8859-15",
        "us-ascii" | "ascii" => "windows-1252",
        other => other,
    };
    Encoding::for_label(label.as_bytes())
}
