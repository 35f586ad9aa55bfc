//! Detection of a console extension on the requesting side.
//!
//! A browser with the extension installed announces itself either in its
//! `User-Agent` (`... FirePHP/0.7.4`) or with an `X-FirePHP-Version`
//! request header. Versions below [`MIN_CLIENT_VERSION`] do not speak the
//! JsonStream protocol.

use std::cmp::Ordering;
use std::sync::OnceLock;

use regex::Regex;

use crate::transport::Transport;

/// Oldest client version that understands the headers this crate writes.
pub const MIN_CLIENT_VERSION: &str = "0.0.6";

static USER_AGENT: OnceLock<Option<Regex>> = OnceLock::new();
static VERSION_HEADER: OnceLock<Option<Regex>> = OnceLock::new();

fn pattern(cell: &'static OnceLock<Option<Regex>>, source: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| Regex::new(source).ok()).as_ref()
}

/// Client version announced in a `User-Agent` value.
pub fn version_from_user_agent(user_agent: &str) -> Option<&str> {
    pattern(&USER_AGENT, r"\sFirePHP/([\.\d]*)\s?")?
        .captures(user_agent)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Client version from an `X-FirePHP-Version` value. The whole value must
/// be a dotted version.
pub fn version_from_header(value: &str) -> Option<&str> {
    pattern(&VERSION_HEADER, r"^([\.\d]*)$")?
        .captures(value)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Compare dotted versions part by part; missing parts count as zero.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let parts = |v: &str| -> Vec<u64> {
        v.split('.')
            .map(|p| p.parse::<u64>().unwrap_or(0))
            .collect()
    };
    let (a, b) = (parts(a), parts(b));
    for i in 0..a.len().max(b.len()) {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        match x.cmp(&y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

fn is_supported(version: &str) -> bool {
    !version.is_empty() && compare_versions(version, MIN_CLIENT_VERSION) != Ordering::Less
}

/// Whether the request behind `transport` comes from a supported client.
pub fn detect_client<T: Transport + ?Sized>(transport: &T) -> bool {
    let from_agent = transport
        .request_header("User-Agent")
        .map_or(false, |ua| version_from_user_agent(&ua).map_or(false, is_supported));
    if from_agent {
        return true;
    }
    transport
        .request_header("X-FirePHP-Version")
        .map_or(false, |v| version_from_header(&v).map_or(false, is_supported))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MemoryTransport;

    #[test]
    fn test_user_agent_version() {
        let ua = "Mozilla/5.0 (X11; Linux x86_64) Gecko/20100101 Firefox/3.6 FirePHP/0.7.4";
        assert_eq!(version_from_user_agent(ua), Some("0.7.4"));
        assert_eq!(version_from_user_agent("FirePHP/0.7.4"), None);
        assert_eq!(version_from_user_agent("Mozilla/5.0 Firefox/3.6"), None);
    }

    #[test]
    fn test_header_version_must_be_whole_value() {
        assert_eq!(version_from_header("0.4.2"), Some("0.4.2"));
        assert_eq!(version_from_header("v0.4.2"), None);
        assert_eq!(version_from_header("0.4.2 beta"), None);
    }

    #[test]
    fn test_compare_versions() {
        assert_eq!(compare_versions("0.0.6", "0.0.6"), Ordering::Equal);
        assert_eq!(compare_versions("0.0.10", "0.0.6"), Ordering::Greater);
        assert_eq!(compare_versions("0.0.5", "0.0.6"), Ordering::Less);
        assert_eq!(compare_versions("1", "0.0.6"), Ordering::Greater);
        assert_eq!(compare_versions("0.0.6.0", "0.0.6"), Ordering::Equal);
    }

    #[test]
    fn test_detect_from_user_agent() {
        let t = MemoryTransport::new()
            .with_request_header("User-Agent", "Mozilla/5.0 Firefox/3.6 FirePHP/0.0.6");
        assert!(detect_client(&t));

        let old = MemoryTransport::new()
            .with_request_header("User-Agent", "Mozilla/5.0 Firefox/3.6 FirePHP/0.0.5");
        assert!(!detect_client(&old));
    }

    #[test]
    fn test_detect_from_version_header() {
        let t = MemoryTransport::new().with_request_header("x-firephp-version", "0.6.2");
        assert!(detect_client(&t));

        let old = MemoryTransport::new().with_request_header("X-FirePHP-Version", "0.0.1");
        assert!(!detect_client(&old));

        let empty = MemoryTransport::new().with_request_header("X-FirePHP-Version", "");
        assert!(!detect_client(&empty));
    }

    #[test]
    fn test_no_request_headers() {
        assert!(!detect_client(&MemoryTransport::new()));
    }
}
