//! Discovery wire format: search probe construction and response parsing.
//!
//! The probe is a minimal SSDP-style `M-SEARCH` request. Responses are a
//! status line plus `Token: value` headers, optionally followed by a blank
//! line and a body that is ignored.

use std::net::SocketAddrV4;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::types::ParsedHeaders;

/// Header carrying the sniffer serial identity
pub const URN_HEADER: &str = "URN";

/// Optional header carrying a free-text placement
pub const LOCATION_HEADER: &str = "LOCATION";

/// Default search target announced in probes
pub const DEFAULT_SEARCH_TARGET: &str = "urn:sniffer:slave";

/// Number of leading characters dropped by [`UrnFormat::StripPrefix`]
const URN_PREFIX_LEN: usize = 5;

/// `<token>:( <value>)?` per line; the value may also follow the colon directly.
const HEADER_PATTERN: &str = r"^([^:\r\n]+):[ \t]*([^\r\n]*?)[ \t]*\r?$";

fn header_regex() -> &'static Regex {
    static HEADER_REGEX: OnceLock<Regex> = OnceLock::new();
    HEADER_REGEX.get_or_init(|| Regex::new(HEADER_PATTERN).expect("header pattern is valid"))
}

/// Build the search probe datagram sent to the multicast group.
pub fn build_search_probe(group: SocketAddrV4, search_target: &str) -> String {
    format!(
        "M-SEARCH * HTTP/1.1\n\
         HOST: {}:{}\n\
         MAN: \"ssdp:discover\"\n\
         MX: 1\n\
         ST: {}\n\
         \n",
        group.ip(),
        group.port(),
        search_target
    )
}

/// Parse a decoded discovery response into its header map.
///
/// Everything after the first empty line is body and is ignored. Lines that
/// don't look like `Token: value` are skipped. Never fails; malformed input
/// yields a partial or empty map.
pub fn parse_headers(text: &str) -> ParsedHeaders {
    let mut headers = ParsedHeaders::new();

    for line in text.lines() {
        if line.is_empty() {
            break;
        }

        let Some(caps) = header_regex().captures(line) else {
            continue;
        };

        let name = caps[1].trim();
        if name.is_empty() {
            continue;
        }

        headers.insert(name.to_uppercase(), caps[2].to_string());
    }

    headers
}

/// How the `URN` header maps onto a device serial.
///
/// Sniffer firmwares disagree on whether the header carries a fixed
/// five-character prefix ahead of the serial. A gateway picks one mode and
/// uses it for every response, otherwise the same sniffer would register
/// under two identities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrnFormat {
    /// Header value is the serial
    #[default]
    Verbatim,
    /// First five characters are a prefix, the remainder is the serial
    StripPrefix,
}

impl UrnFormat {
    /// Canonical serial for a raw `URN` value, `None` if nothing usable remains.
    pub fn canonicalize(self, urn: &str) -> Option<String> {
        let serial: String = match self {
            UrnFormat::Verbatim => urn.trim().to_string(),
            UrnFormat::StripPrefix => urn.trim().chars().skip(URN_PREFIX_LEN).collect(),
        };

        if serial.is_empty() {
            None
        } else {
            Some(serial)
        }
    }
}
