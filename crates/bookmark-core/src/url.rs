//! URL canonicalization and equivalence for bookmark targets.
//!
//! Stored bookmark URLs use one canonical form:
//!
//! - scheme is always `https`
//! - host is lowercased and a leading `www.` is dropped
//! - default ports are omitted
//! - a root path is omitted, other paths lose their trailing slash
//! - the query string is kept only on request, the fragment always
//!
//! [`equivalent`] is a looser relation used only to detect duplicate
//! bookmarks. [`extract_resource_tag`] computes the `d` tag of a web bookmark
//! event and deliberately keeps case and path as given.

use std::net::Ipv4Addr;

use ::url::{Host, Url};

use crate::UrlError;

const DEFAULT_SCHEME: &str = "https";
const HTTPS_PORT: u16 = 443;

/// Hosts that are really a scheme name typed twice (`https://http`).
const RESERVED_HOSTS: &[&str] = &["http", "https", "ftp"];

/// Canonicalize a user supplied URL string.
///
/// Input without a scheme, or in bare `host:port[/path]` form, is read as
/// `https://…`. Input that parses but carries no host (`mailto:x`) is returned
/// trimmed and otherwise untouched.
///
/// # Errors
///
/// Returns [`UrlError::MalformedInput`] for blank input or when the string
/// cannot be parsed even after prepending the default scheme.
pub fn canonicalize(raw: &str, keep_params: bool) -> Result<String, UrlError> {
    let input = raw.trim();
    if input.is_empty() {
        return Err(malformed(raw, "empty input"));
    }

    let candidate = if is_host_port(input) || !has_scheme(input) {
        format!("{DEFAULT_SCHEME}://{input}")
    } else {
        input.to_string()
    };

    let parsed = Url::parse(&candidate).map_err(|err| malformed(raw, &err.to_string()))?;
    let Some(host) = typed_host(&parsed, &candidate) else {
        return Ok(input.to_string());
    };

    let mut canonical = format!("{DEFAULT_SCHEME}://{}", strip_www(&host));

    if let Some(port) = parsed.port().filter(|port| *port != HTTPS_PORT) {
        canonical.push_str(&format!(":{port}"));
    }

    canonical.push_str(parsed.path().trim_end_matches('/'));

    if keep_params {
        if let Some(query) = parsed.query().filter(|query| !query.is_empty()) {
            canonical.push('?');
            canonical.push_str(query);
        }
    }

    if let Some(fragment) = parsed.fragment().filter(|fragment| !fragment.is_empty()) {
        canonical.push('#');
        canonical.push_str(fragment);
    }

    Ok(canonical)
}

/// Whether a string is acceptable as a bookmark URL.
///
/// Stricter than [`canonicalize`]: the canonical form must be http(s) with a
/// plausible host (`localhost`, a dotted name, or an IPv4 address).
pub fn is_valid(raw: &str) -> bool {
    let Ok(canonical) = canonicalize(raw, false) else {
        return false;
    };
    let Ok(parsed) = Url::parse(&canonical) else {
        return false;
    };

    if !matches!(parsed.scheme(), "http" | "https") {
        return false;
    }

    typed_host(&parsed, &canonical).is_some_and(|host| is_acceptable_host(&host))
}

/// Whether two URLs point at the same bookmark target.
///
/// Both sides are canonicalized (keeping the query only when `strict`),
/// lowercased and stripped of trailing slashes before comparison. A side
/// that cannot be canonicalized is never equivalent to anything.
pub fn equivalent(a: &str, b: &str, strict: bool) -> bool {
    match (comparable_form(a, strict), comparable_form(b, strict)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Compute the NIP-B0 `d` tag for a URL: scheme, query and fragment removed.
///
/// Case and path are preserved. Blank input yields an empty string.
pub fn extract_resource_tag(raw: &str) -> String {
    let input = raw.trim();

    let without_scheme = match input.find("://") {
        Some(idx) if is_scheme(&input[..idx]) => &input[idx + 3..],
        _ => input,
    };

    let end = without_scheme
        .find(|c: char| c == '?' || c == '#')
        .unwrap_or(without_scheme.len());

    without_scheme[..end].to_string()
}

fn comparable_form(raw: &str, strict: bool) -> Option<String> {
    let canonical = canonicalize(raw, strict).ok()?;
    Some(canonical.to_lowercase().trim_end_matches('/').to_string())
}

fn malformed(input: &str, reason: &str) -> UrlError {
    UrlError::MalformedInput {
        input: input.to_string(),
        reason: reason.to_string(),
    }
}

/// RFC 3986 scheme: `ALPHA *( ALPHA / DIGIT / "+" / "-" / "." )`.
fn is_scheme(value: &str) -> bool {
    let mut chars = value.chars();
    matches!(chars.next(), Some(first) if first.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

fn has_scheme(input: &str) -> bool {
    input
        .split_once(':')
        .is_some_and(|(scheme, _)| is_scheme(scheme))
}

/// `example.com:8080` or `localhost:3000/path` look like a scheme to the
/// grammar above but are really a host with a port.
fn is_host_port(input: &str) -> bool {
    let Some((host, rest)) = input.split_once(':') else {
        return false;
    };
    if host.is_empty() || host.contains('/') {
        return false;
    }

    let port = rest.split('/').next().unwrap_or_default();
    !port.is_empty() && port.chars().all(|c| c.is_ascii_digit())
}

/// Lowercased host of `parsed`, as written in `source`.
///
/// The URL parser turns numeric shorthand (`1`, `2130706433`, `0x7f.1`) into
/// an IPv4 address. Only a literal dotted quad is kept as an address; any
/// other spelling is returned the way it was typed.
fn typed_host(parsed: &Url, source: &str) -> Option<String> {
    match parsed.host()? {
        Host::Ipv4(addr) => match authority_host(source) {
            Some(typed) if typed.parse::<Ipv4Addr>().is_err() => Some(typed.to_lowercase()),
            _ => Some(addr.to_string()),
        },
        Host::Domain(domain) if domain.is_empty() => None,
        Host::Domain(domain) => Some(domain.to_lowercase()),
        Host::Ipv6(_) => parsed.host_str().map(str::to_lowercase),
    }
}

/// Host portion of `scheme://[userinfo@]host[:port]...`, untouched.
fn authority_host(source: &str) -> Option<&str> {
    let (_, rest) = source.split_once("://")?;
    let authority = rest
        .split(|c: char| matches!(c, '/' | '?' | '#' | '\\'))
        .next()
        .unwrap_or_default();
    let host_port = authority
        .rsplit_once('@')
        .map_or(authority, |(_, host_port)| host_port);
    let host = host_port
        .rsplit_once(':')
        .map_or(host_port, |(host, _)| host);
    (!host.is_empty()).then_some(host)
}

fn strip_www(host: &str) -> &str {
    let mut host = host;
    while let Some(rest) = host.strip_prefix("www.") {
        if rest.is_empty() {
            break;
        }
        host = rest;
    }
    host
}

fn is_acceptable_host(host: &str) -> bool {
    if host.is_empty() || RESERVED_HOSTS.contains(&host) || host.chars().all(|c| c == '.') {
        return false;
    }

    host == "localhost" || host.contains('.') || host.parse::<Ipv4Addr>().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canon(raw: &str) -> String {
        canonicalize(raw, false).unwrap()
    }

    #[test]
    fn test_adds_https_scheme() {
        assert_eq!(canon("example.com"), "https://example.com");
    }

    #[test]
    fn test_forces_https_scheme() {
        assert_eq!(canon("http://example.com"), "https://example.com");
        assert_eq!(canon("HTTP://Example.com/Path"), "https://example.com/Path");
    }

    #[test]
    fn test_lowercases_host_and_drops_root_slash() {
        assert_eq!(canon("EXAMPLE.com/"), "https://example.com");
    }

    #[test]
    fn test_strips_www_and_trailing_slash() {
        assert_eq!(canon("www.example.com/x/"), "https://example.com/x");
        assert_eq!(canon("https://WWW.example.com"), "https://example.com");
    }

    #[test]
    fn test_query_only_when_requested() {
        assert_eq!(canon("example.com/path?q=test"), "https://example.com/path");
        assert_eq!(
            canonicalize("example.com/path?q=test", true).unwrap(),
            "https://example.com/path?q=test"
        );
    }

    #[test]
    fn test_keeps_fragment() {
        assert_eq!(canon("example.com/path#section"), "https://example.com/path#section");
    }

    #[test]
    fn test_ports() {
        assert_eq!(canon("example.com:8080/path"), "https://example.com:8080/path");
        assert_eq!(canon("localhost:3000"), "https://localhost:3000");
        assert_eq!(canon("https://example.com:443/a"), "https://example.com/a");
        assert_eq!(canon("http://example.com:80/a"), "https://example.com/a");
    }

    #[test]
    fn test_malformed_input() {
        assert!(matches!(
            canonicalize("", false),
            Err(UrlError::MalformedInput { .. })
        ));
        assert!(canonicalize("   ", false).is_err());
        assert!(canonicalize("not a url", false).is_err());
        assert!(canonicalize("http://", false).is_err());
    }

    #[test]
    fn test_numeric_hosts_keep_their_spelling() {
        assert_eq!(canon("http://2130706433/x"), "https://2130706433/x");
        assert_eq!(canon("http://0x7f.1"), "https://0x7f.1");
        assert_eq!(canon("42"), "https://42");
        assert_eq!(canon("http://127.0.0.1/x"), "https://127.0.0.1/x");
        assert_eq!(canon("https://user@10.0.0.1:8080/a"), "https://10.0.0.1:8080/a");
    }

    #[test]
    fn test_hostless_url_passes_through() {
        assert_eq!(canon("mailto:someone@example.com"), "mailto:someone@example.com");
    }

    #[test]
    fn test_canonicalize_is_idempotent() {
        let inputs = [
            "example.com",
            "EXAMPLE.com/",
            "www.example.com/x/",
            "http://www.www.example.com//a//",
            "example.com:8080/path?q=1#frag",
            "https://example.com/a%20b",
            "mailto:someone@example.com",
            "localhost:3000/",
            "http://2130706433/x",
            "http://0x7f.1",
        ];
        for input in inputs {
            for keep_params in [false, true] {
                let once = canonicalize(input, keep_params).unwrap();
                let twice = canonicalize(&once, keep_params).unwrap();
                assert_eq!(once, twice, "not idempotent for {input}");
            }
        }
    }

    #[test]
    fn test_is_valid_accepts() {
        assert!(is_valid("https://example.com"));
        assert!(is_valid("http://example.com/path"));
        assert!(is_valid("example.com"));
        assert!(is_valid("localhost:3000"));
        assert!(is_valid("http://192.168.1.10/admin"));
    }

    #[test]
    fn test_is_valid_rejects() {
        for input in [
            "",
            "not a url",
            "http://",
            "https://http",
            "http://https",
            "ftp://http",
            "https://ftp",
            "https://.",
            "https://..",
            "https://...",
            "https://com",
            "mailto:someone@example.com",
            "https://1",
            "42",
            "http://2130706433",
        ] {
            assert!(!is_valid(input), "{input} should be invalid");
        }
    }

    #[test]
    fn test_equivalent() {
        assert!(equivalent("http://example.com", "https://www.example.com/", false));
        assert!(equivalent("https://EXAMPLE.com", "https://example.com", false));
        assert!(equivalent("https://example.com/path?q=test", "https://example.com/path", false));
        assert!(equivalent("https://example.com/path", "http://www.example.com/path/", false));
        assert!(!equivalent("https://example.com/a", "https://example.com/b", false));
        assert!(!equivalent("https://example.com", "https://example.org", false));
    }

    #[test]
    fn test_equivalent_strict_compares_query() {
        assert!(!equivalent(
            "https://example.com/path?q=test",
            "https://example.com/path",
            true
        ));
        assert!(equivalent(
            "https://example.com/path?q=test",
            "http://www.example.com/path?q=test",
            true
        ));
    }

    #[test]
    fn test_equivalent_with_unparsable_side() {
        assert!(!equivalent("", "", false));
        assert!(!equivalent("not a url", "https://example.com", false));
    }

    #[test]
    fn test_extract_resource_tag() {
        assert_eq!(extract_resource_tag("https://example.com/post?x=1#s"), "example.com/post");
        assert_eq!(
            extract_resource_tag("https://alice.blog/post?param=value#section"),
            "alice.blog/post"
        );
        assert_eq!(extract_resource_tag("HTTP://Example.com/Path/"), "Example.com/Path/");
        assert_eq!(extract_resource_tag("example.com/a#b"), "example.com/a");
        assert_eq!(extract_resource_tag("   "), "");
    }
}
