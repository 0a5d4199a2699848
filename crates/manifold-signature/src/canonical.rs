//! Canonical message construction for Manifold request signatures.
//!
//! The canonical message is the exact byte sequence the ephemeral key signs:
//!
//! ```text
//! lower(METHOD) SP PATH ['?' CanonicalQuery] LF
//! lower(NAME) ':' SP VALUES LF          (once per name in X-Signed-Headers)
//! x-signed-headers ':' SP VALUES LF
//! BODY
//! ```
//!
//! `CanonicalQuery` is the raw query string split on `&`, sorted
//! lexicographically as whole `key=value` segments, and joined with `&`. The
//! `?` is omitted when there is no query string. `VALUES` are the header's
//! occurrences in request order, trimmed of surrounding whitespace and joined
//! with `, `. Values that are valid UTF-8 lose Unicode whitespace such as
//! U+00A0; any other value loses ASCII whitespace only. The body is appended verbatim.
//!
//! Signer and verifier must agree on every byte, so nothing here decodes,
//! re-encodes, or otherwise normalizes beyond the rules above.

use std::borrow::Cow;
use std::io::{self, Read};

use http::header::{HOST, HeaderName, HeaderValue};
use http::{HeaderMap, Method};

/// The header listing which headers are covered by the signature.
///
/// It is always appended to its own list, so the declaration signs itself.
pub const SIGNED_HEADERS_HEADER: &str = "x-signed-headers";

/// Build the canonical message for a request head and its body.
///
/// The body is read to the end and appended after the header block.
///
/// # Examples
///
/// ```
/// use manifold_signature::canonical::build_canonical_message;
///
/// let (parts, ()) = http::Request::builder()
///     .method("PUT")
///     .uri("/v1/resources?foo=bar")
///     .header("X-Signed-Headers", "date")
///     .header("Date", "2017-03-05T23:53:08Z")
///     .body(())
///     .unwrap()
///     .into_parts();
///
/// let message = build_canonical_message(&parts, &b"Test body data"[..]).unwrap();
/// assert_eq!(
///     message,
///     b"put /v1/resources?foo=bar\n\
///       date: 2017-03-05T23:53:08Z\n\
///       x-signed-headers: date\n\
///       Test body data"
/// );
/// ```
///
/// # Errors
///
/// Returns any I/O error raised while reading `body`.
pub fn build_canonical_message(
    parts: &http::request::Parts,
    mut body: impl Read,
) -> io::Result<Vec<u8>> {
    let mut message = build_request_line(
        parts.method.as_str(),
        parts.uri.path(),
        parts.uri.query().unwrap_or(""),
    )
    .into_bytes();

    // Only the first X-Signed-Headers occurrence selects the list.
    let header_list: Cow<'_, str> = parts
        .headers
        .get(SIGNED_HEADERS_HEADER)
        .map_or(Cow::Borrowed(""), |v| String::from_utf8_lossy(v.as_bytes()));
    let names = signed_header_names(&header_list);

    message.extend_from_slice(&build_canonical_headers(
        &parts.headers,
        effective_host(parts),
        &names,
    ));

    body.read_to_end(&mut message)?;
    Ok(message)
}

/// Build the first line of the canonical message, including its newline.
///
/// An empty method is treated as `GET`.
///
/// # Examples
///
/// ```
/// use manifold_signature::canonical::build_request_line;
///
/// assert_eq!(build_request_line("PUT", "/v1/resources", ""), "put /v1/resources\n");
/// assert_eq!(build_request_line("", "/", "b=2&a=1"), "get /?a=1&b=2\n");
/// ```
#[must_use]
pub fn build_request_line(method: &str, path: &str, query: &str) -> String {
    let method = if method.is_empty() {
        Method::GET.as_str()
    } else {
        method
    };

    let mut line = String::with_capacity(method.len() + path.len() + query.len() + 3);
    line.push_str(&method.to_lowercase());
    line.push(' ');
    line.push_str(path);

    if !query.is_empty() {
        line.push('?');
        line.push_str(&build_canonical_query_string(query));
    }

    line.push('\n');
    line
}

/// Build the canonical query string.
///
/// The raw query is split on `&` and the segments are sorted as opaque byte
/// strings, so `A=1` sorts before `a=0` and `a=1&a=0` becomes `a=0&a=1`.
/// Segments are never decoded.
///
/// # Examples
///
/// ```
/// use manifold_signature::canonical::build_canonical_query_string;
///
/// assert_eq!(build_canonical_query_string("foo=bar&a=1"), "a=1&foo=bar");
/// assert_eq!(build_canonical_query_string(""), "");
/// ```
#[must_use]
pub fn build_canonical_query_string(query: &str) -> String {
    if query.is_empty() {
        return String::new();
    }

    let mut segments: Vec<&str> = query.split('&').collect();
    segments.sort_unstable();
    segments.join("&")
}

/// Expand an `X-Signed-Headers` value into the ordered list of names to sign.
///
/// The value is split on single spaces and `x-signed-headers` is appended.
///
/// # Examples
///
/// ```
/// use manifold_signature::canonical::signed_header_names;
///
/// assert_eq!(
///     signed_header_names("host date"),
///     vec!["host", "date", "x-signed-headers"]
/// );
/// ```
#[must_use]
pub fn signed_header_names(header_list: &str) -> Vec<&str> {
    header_list
        .split(' ')
        .chain(std::iter::once(SIGNED_HEADERS_HEADER))
        .collect()
}

/// Build the canonical header block, one `name: value` line per name.
///
/// Names keep the order given and are written lowercased. `host` is taken
/// from `effective_host` rather than looked up. A name that does not occur on
/// the request, or is not a valid header name, produces an empty value.
#[must_use]
pub fn build_canonical_headers(
    headers: &HeaderMap,
    effective_host: &[u8],
    names: &[&str],
) -> Vec<u8> {
    let mut block = Vec::new();

    for name in names {
        block.extend_from_slice(name.to_lowercase().as_bytes());
        block.extend_from_slice(b": ");

        if name.eq_ignore_ascii_case(HOST.as_str()) {
            block.extend_from_slice(trim_value(effective_host));
        } else {
            for (i, value) in header_values(headers, name).enumerate() {
                if i > 0 {
                    block.extend_from_slice(b", ");
                }
                block.extend_from_slice(trim_value(value.as_bytes()));
            }
        }

        block.push(b'\n');
    }

    block
}

/// The host a request was addressed to.
///
/// This is the first `Host` header if present, otherwise the host and port of
/// the request URI (HTTP/2 requests carry it there), otherwise empty.
#[must_use]
pub fn effective_host(parts: &http::request::Parts) -> &[u8] {
    if let Some(host) = parts.headers.get(HOST) {
        return host.as_bytes();
    }

    parts
        .uri
        .authority()
        .map(|authority| {
            let authority = authority.as_str();
            authority
                .rsplit_once('@')
                .map_or(authority, |(_, host)| host)
        })
        .unwrap_or_default()
        .as_bytes()
}

fn trim_value(value: &[u8]) -> &[u8] {
    std::str::from_utf8(value).map_or_else(
        |_| value.trim_ascii(),
        |text| text.trim().as_bytes(),
    )
}

/// All occurrences of a header, in request order.
fn header_values<'a>(
    headers: &'a HeaderMap,
    name: &str,
) -> impl Iterator<Item = &'a HeaderValue> + use<'a> {
    HeaderName::from_bytes(name.as_bytes())
        .ok()
        .into_iter()
        .flat_map(move |name| headers.get_all(name).into_iter())
}
