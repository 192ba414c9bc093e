use chardetng::EncodingDetector;
use encoding_rs::Encoding;
use url::Url;
use watch_logging::watch_warn;

/// How far into the document a `<meta charset>` declaration is looked for.
const META_SNIFF_LEN: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedHtml {
    pub html: String,
    pub encoding_label: String,
    /// Some byte sequences were invalid and replaced with U+FFFD.
    pub had_errors: bool,
}

/// Decode a fetched page into UTF-8.
///
/// Order: BOM, Content-Type charset, `<meta>` charset in the document head,
/// then a chardetng guess hinted with the top-level domain of `source_url`.
/// Malformed sequences are replaced rather than failing the page.
pub fn decode_html(
    bytes: &[u8],
    content_type: Option<&str>,
    source_url: Option<&str>,
) -> DecodedHtml {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return decode_with(bytes, encoding);
    }

    let declared = content_type
        .and_then(header_charset)
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .or_else(|| meta_charset(bytes));
    if let Some(encoding) = declared {
        return decode_with(bytes, encoding.output_encoding());
    }

    let tld = source_url.and_then(top_level_domain);
    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let guessed = detector.guess(tld.as_deref().map(str::as_bytes), true);
    decode_with(bytes, guessed)
}

fn header_charset(content_type: &str) -> Option<String> {
    content_type.split(';').find_map(|part| {
        let (key, value) = part.split_once('=')?;
        if key.trim().eq_ignore_ascii_case("charset") {
            Some(value.trim().trim_matches(['"', '\'']).to_string())
        } else {
            None
        }
    })
}

fn meta_charset(bytes: &[u8]) -> Option<&'static Encoding> {
    let head = bytes[..bytes.len().min(META_SNIFF_LEN)].to_ascii_lowercase();
    let needle = b"charset=";
    let mut offset = 0;
    while let Some(pos) = head[offset..]
        .windows(needle.len())
        .position(|window| window == needle)
    {
        let value_start = offset + pos + needle.len();
        let label: Vec<u8> = head[value_start..]
            .iter()
            .skip_while(|&&b| matches!(b, b'"' | b'\'' | b' '))
            .take_while(|&&b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b':' | b'.'))
            .copied()
            .collect();
        if let Some(encoding) = Encoding::for_label(&label) {
            return Some(encoding);
        }
        offset = value_start;
    }
    None
}

fn top_level_domain(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    host.rsplit('.').next().map(|tld| tld.to_ascii_lowercase())
}

fn decode_with(bytes: &[u8], enc: &'static Encoding) -> DecodedHtml {
    let (text, _, had_errors) = enc.decode(bytes);
    if had_errors {
        watch_warn!("Page contains bytes invalid in {}; replaced", enc.name());
    }
    DecodedHtml {
        html: text.into_owned(),
        encoding_label: enc.name().to_string(),
        had_errors,
    }
}
