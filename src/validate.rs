//! Input validation for user-supplied prefixes, ASNs and base URLs.
//!
//! All checks run before any network call is made.
use crate::IrrExplorerError;
use ipnet::IpNet;
use reqwest::Url;
use std::str::FromStr;

/// Check that `text` is an IPv4 or IPv6 network in CIDR notation.
///
/// The mask must be present and within the address family's bit width.
///
/// # Examples
/// ```
/// use irr_explorer::validate_prefix_format;
/// assert!(validate_prefix_format("192.0.2.0/24"));
/// assert!(validate_prefix_format("2001:db8::/32"));
/// assert!(!validate_prefix_format("192.0.2.0"));
/// ```
pub fn validate_prefix_format(text: &str) -> bool {
    IpNet::from_str(text).is_ok()
}

/// Strip an optional, case-insensitive `AS` prefix.
fn strip_as_prefix(text: &str) -> &str {
    match text.get(..2) {
        Some(p) if p.eq_ignore_ascii_case("as") => &text[2..],
        _ => text,
    }
}

fn parse_asn_number(text: &str) -> Option<u32> {
    let digits = strip_as_prefix(text);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse::<u32>().ok()
}

/// Check that `text` is an ASN, with or without an `AS` prefix, below 2^32.
///
/// # Examples
/// ```
/// use irr_explorer::validate_asn_format;
/// assert!(validate_asn_format("AS12345"));
/// assert!(validate_asn_format("as12345"));
/// assert!(validate_asn_format("12345"));
/// assert!(!validate_asn_format("AS4294967296"));
/// ```
pub fn validate_asn_format(text: &str) -> bool {
    parse_asn_number(text).is_some()
}

/// Normalize an ASN string into the `AS<number>` form used by the API.
pub fn normalize_asn(text: &str) -> Result<String, IrrExplorerError> {
    parse_asn_number(text)
        .map(|asn| format!("AS{}", asn))
        .ok_or_else(|| IrrExplorerError::InvalidAsn(text.to_string()))
}

/// Check that `text` is an absolute `http` or `https` URL whose host has at
/// least two dot-separated labels.
pub fn validate_url_format(text: &str) -> bool {
    if text.is_empty() || text.chars().any(char::is_whitespace) {
        return false;
    }
    let url = match Url::parse(text) {
        Ok(url) => url,
        Err(_) => return false,
    };
    if !matches!(url.scheme(), "http" | "https") {
        return false;
    }
    match url.host_str() {
        Some(host) => host.contains('.') && host.split('.').all(|label| !label.is_empty()),
        None => false,
    }
}
