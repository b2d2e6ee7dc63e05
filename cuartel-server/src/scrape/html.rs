//! Scanning of the primary station page.
//!
//! Station pages are loosely structured HTML with inline scripts, so we scan
//! for a couple of fixed shapes instead of parsing the document.

/// Default location of the vehicle data endpoint.
pub const DEFAULT_DATA_URL_PREFIX: &str = "https://icbs.cl/cuartel/datos.php";

/// Name of the hidden input that carries one volunteer's presence flag.
const PERSONNEL_FIELD: &str = "estado_personal";

/// Flag value meaning the volunteer is present.
const PRESENT_VALUE: &str = "1";

/// Find the signed vehicle data URL embedded in a station page.
///
/// The page assigns it to a script variable:
///
/// ```text
/// var url="https://icbs.cl/cuartel/datos.php?id_proce=..&time=..&hash=..";
/// ```
///
/// `prefix` is the endpoint without its query string. The query must
/// contain `&time=` followed by `&hash=`, and the whole URL must sit on one
/// line. Returns the first occurrence that fits.
pub fn extract_data_url(html: &str, prefix: &str) -> Option<String> {
    let opener = "var url=\"";
    let needle = format!("{opener}{prefix}?id_proce=");

    let mut from = 0;
    while let Some(rel) = html.get(from..)?.find(&needle) {
        let start = from + rel + opener.len();
        let rest = &html[start..];

        if let Some(end) = rest.find('"') {
            let candidate = &rest[..end];
            if is_signed_query(candidate) {
                return Some(candidate.to_string());
            }
        }

        from = start;
    }

    None
}

/// Check the `&time=..&hash=..` shape of a candidate URL.
fn is_signed_query(url: &str) -> bool {
    if url.contains(['\n', '\r']) {
        return false;
    }

    url.find("&time=")
        .is_some_and(|t| url[t..].contains("&hash="))
}

/// Count volunteers flagged as present on a station page.
///
/// Each volunteer has a hidden input such as
/// `<input type="hidden" name="estado_personal" value="1">`; only inputs
/// whose value is exactly `"1"` are counted.
pub fn count_personnel(html: &str) -> u32 {
    // ASCII lowercasing keeps byte offsets aligned with `html`.
    let lower = html.to_ascii_lowercase();
    let mut count = 0;
    let mut from = 0;

    while let Some(rel) = lower[from..].find("<input") {
        let tag_start = from + rel + "<input".len();
        let Some(tag_len) = html[tag_start..].find('>') else {
            break;
        };
        let tag = &html[tag_start..tag_start + tag_len];

        if is_present_flag(tag) {
            count += 1;
        }

        from = tag_start + tag_len;
    }

    count
}

fn is_present_flag(tag: &str) -> bool {
    let attrs = parse_attributes(tag);
    let attr = |name: &str| {
        attrs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| *v)
    };

    attr("type").is_some_and(|t| t.eq_ignore_ascii_case("hidden"))
        && attr("name") == Some(PERSONNEL_FIELD)
        && attr("value").map(str::trim) == Some(PRESENT_VALUE)
}

/// Split the inside of a tag into `(name, value)` pairs.
///
/// Values may be double-quoted, single-quoted or bare. Attributes without
/// a value get an empty one.
fn parse_attributes(tag: &str) -> Vec<(&str, &str)> {
    let bytes = tag.as_bytes();
    let mut attrs = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        while i < bytes.len() && (bytes[i].is_ascii_whitespace() || bytes[i] == b'/') {
            i += 1;
        }
        let name_start = i;
        while i < bytes.len() && !bytes[i].is_ascii_whitespace() && !matches!(bytes[i], b'=' | b'/')
        {
            i += 1;
        }
        let name = &tag[name_start..i];

        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() || bytes[i] != b'=' {
            if !name.is_empty() {
                attrs.push((name, ""));
            }
            continue;
        }
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }

        let value = match bytes.get(i) {
            Some(&quote @ (b'"' | b'\'')) => {
                let value_start = i + 1;
                let value_end = tag[value_start..]
                    .find(quote as char)
                    .map_or(tag.len(), |e| value_start + e);
                i = (value_end + 1).min(tag.len());
                &tag[value_start..value_end]
            }
            _ => {
                let value_start = i;
                while i < bytes.len() && !bytes[i].is_ascii_whitespace() {
                    i += 1;
                }
                &tag[value_start..i]
            }
        };

        if !name.is_empty() {
            attrs.push((name, value));
        }
    }

    attrs
}
