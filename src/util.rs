//! Text decoding, entity and path helpers shared by the parsers.

use std::borrow::Cow;
use std::path::{Component, Path};

/// Decode bytes to a string, handling various encodings.
///
/// 1. UTF-8 first (a BOM is stripped by encoding_rs)
/// 2. If malformed, the hint encoding (from `<?xml encoding="..."?>`)
/// 3. Windows-1252 as the last resort, common in old ebooks
pub fn decode_text<'a>(bytes: &'a [u8], hint_encoding: Option<&str>) -> Cow<'a, str> {
    let (result, _encoding, malformed) = encoding_rs::UTF_8.decode(bytes);

    if !malformed {
        return result;
    }

    if let Some(name) = hint_encoding
        && let Some(encoding) = encoding_rs::Encoding::for_label(name.as_bytes())
    {
        let (result, _, _) = encoding.decode(bytes);
        return result;
    }

    let (result, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    result
}

/// Decode a markup file, taking the encoding hint from its XML declaration.
pub fn decode_markup(bytes: &[u8]) -> Cow<'_, str> {
    decode_text(bytes, extract_xml_encoding(bytes))
}

/// Extract the encoding label from an XML declaration, if present.
///
/// Only the first 100 bytes are inspected.
pub fn extract_xml_encoding(bytes: &[u8]) -> Option<&str> {
    let check_len = bytes.len().min(100);
    let prefix = &bytes[..check_len];

    let xml_start = prefix.windows(5).position(|w| w == b"<?xml")?;
    let after_xml = &prefix[xml_start..];

    let enc_pos = after_xml
        .windows(9)
        .position(|w| w.eq_ignore_ascii_case(b"encoding="))?;
    let after_enc = &after_xml[enc_pos + 9..];

    let quote = *after_enc.first()?;
    if quote != b'"' && quote != b'\'' {
        return None;
    }

    let value_end = after_enc[1..].iter().position(|&b| b == quote)? + 1;
    std::str::from_utf8(&after_enc[1..value_end]).ok()
}

/// Resolve an XML entity or character reference name (without `&`/`;`).
///
/// Covers the XML built-ins, numeric references, and the HTML named entities
/// that routinely leak into XHTML content documents.
pub fn resolve_entity(entity: &str) -> Option<String> {
    let named = match entity {
        "apos" => '\'',
        "quot" => '"',
        "lt" => '<',
        "gt" => '>',
        "amp" => '&',
        "nbsp" => '\u{a0}',
        "shy" => '\u{ad}',
        "copy" => '\u{a9}',
        "reg" => '\u{ae}',
        "trade" => '\u{2122}',
        "deg" => '\u{b0}',
        "middot" => '\u{b7}',
        "laquo" => '\u{ab}',
        "raquo" => '\u{bb}',
        "ndash" => '\u{2013}',
        "mdash" => '\u{2014}',
        "lsquo" => '\u{2018}',
        "rsquo" => '\u{2019}',
        "sbquo" => '\u{201a}',
        "ldquo" => '\u{201c}',
        "rdquo" => '\u{201d}',
        "bdquo" => '\u{201e}',
        "hellip" => '\u{2026}',
        "bull" => '\u{2022}',
        "dagger" => '\u{2020}',
        "Dagger" => '\u{2021}',
        "thinsp" => '\u{2009}',
        "ensp" => '\u{2002}',
        "emsp" => '\u{2003}',
        "zwnj" => '\u{200c}',
        "zwj" => '\u{200d}',
        "eacute" => '\u{e9}',
        "egrave" => '\u{e8}',
        "aacute" => '\u{e1}',
        "agrave" => '\u{e0}',
        "ccedil" => '\u{e7}',
        "ouml" => '\u{f6}',
        "uuml" => '\u{fc}',
        "auml" => '\u{e4}',
        "szlig" => '\u{df}',
        "times" => '\u{d7}',
        "sect" => '\u{a7}',
        "para" => '\u{b6}',
        _ => {
            if let Some(hex) = entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
            {
                let code = u32::from_str_radix(hex, 16).ok()?;
                return char::from_u32(code).map(|c| c.to_string());
            }
            let dec = entity.strip_prefix('#')?;
            let code = dec.parse::<u32>().ok()?;
            return char::from_u32(code).map(|c| c.to_string());
        }
    };
    Some(named.to_string())
}

/// Escape character data for XML text content.
pub fn escape_text(s: &str) -> Cow<'_, str> {
    if !s.contains(['&', '<', '>']) {
        return Cow::Borrowed(s);
    }
    Cow::Owned(
        s.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;"),
    )
}

/// Escape an attribute value for a double-quoted XML attribute.
pub fn escape_attr(s: &str) -> Cow<'_, str> {
    if !s.contains(['&', '<', '>', '"']) {
        return Cow::Borrowed(s);
    }
    Cow::Owned(
        s.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
            .replace('"', "&quot;"),
    )
}

/// Local part of a possibly prefixed XML name (`dc:title` -> `title`).
pub fn local_name(name: &str) -> &str {
    name.rsplit_once(':').map_or(name, |(_, local)| local)
}

/// Resolve `rel` against the directory `base_dir`, both archive-relative with
/// `/` separators. `..` components pop, `.` is dropped, a leading `/` anchors
/// at the archive root.
pub fn resolve_path(base_dir: &str, rel: &str) -> String {
    let rel_path = Path::new(rel);

    if rel_path.has_root() {
        return rel.trim_start_matches('/').to_string();
    }

    let mut stack: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();

    for component in rel_path.components() {
        match component {
            Component::ParentDir => {
                stack.pop();
            }
            Component::Normal(s) => {
                if let Some(s) = s.to_str() {
                    stack.push(s);
                }
            }
            _ => {}
        }
    }

    stack.join("/")
}

/// Archive-style form of a relative path: components joined with `/`.
pub fn archive_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Decode a manifest or NCX href: drop the fragment, then percent-decode.
pub fn decode_href(href: &str) -> String {
    let path = href.split('#').next().unwrap_or(href);
    percent_encoding::percent_decode_str(path)
        .decode_utf8_lossy()
        .into_owned()
}
