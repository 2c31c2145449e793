//! BEP-9 magnet URI parsing.
//!
//! The query is decoded as `application/x-www-form-urlencoded`. Strict mode
//! rejects any malformed parameter. Lenient mode logs and skips parameters it
//! cannot make sense of (bad tracker URLs, unparsable peer addresses, empty
//! values) and only fails when no usable info hash can be recovered.

use std::net::SocketAddr;

use url::form_urlencoded;

use super::types::{MagnetLink, PeerAddress};
use crate::torrent::{InfoHash, TorrentError};

const BTIH_PREFIX: &str = "urn:btih:";

/// How tolerant [`MagnetParser`] is of malformed input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseMode {
    Strict,
    #[default]
    Lenient,
}

/// Parser for `magnet:?xt=urn:btih:...` URIs.
#[derive(Debug, Clone, Copy, Default)]
pub struct MagnetParser {
    mode: ParseMode,
}

fn invalid(reason: impl Into<String>) -> TorrentError {
    TorrentError::InvalidMagnetLink {
        reason: reason.into(),
    }
}

impl MagnetParser {
    pub fn strict() -> Self {
        Self {
            mode: ParseMode::Strict,
        }
    }

    pub fn lenient() -> Self {
        Self {
            mode: ParseMode::Lenient,
        }
    }

    pub fn mode(&self) -> ParseMode {
        self.mode
    }

    /// Parses a magnet URI.
    ///
    /// # Errors
    ///
    /// - `TorrentError::InvalidMagnetLink` - Not a magnet URI, no `urn:btih` info
    ///   hash, or (strict mode only) any malformed parameter
    pub fn parse(&self, magnet_url: &str) -> Result<MagnetLink, TorrentError> {
        let query = self.strip_scheme(magnet_url.trim())?;

        let mut info_hash: Option<InfoHash> = None;
        let mut display_name = None;
        let mut trackers: Vec<String> = Vec::new();
        let mut peers: Vec<PeerAddress> = Vec::new();

        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            if value.is_empty() {
                self.reject(format!("parameter without value: {key}"))?;
                continue;
            }
            let value = value.into_owned();

            match &*key {
                "xt" => {
                    let Some(hash) = self.exact_topic(&value)? else {
                        continue;
                    };
                    match info_hash {
                        None => info_hash = Some(hash),
                        Some(existing) if existing == hash => {}
                        Some(existing) => self.reject(format!(
                            "conflicting info hashes {existing} and {hash}"
                        ))?,
                    }
                }
                "dn" => display_name = Some(value),
                "tr" => {
                    if url::Url::parse(&value).is_err() {
                        self.reject(format!("invalid tracker URL: {value}"))?;
                    } else if !trackers.contains(&value) {
                        trackers.push(value);
                    }
                }
                "x.pe" => match parse_peer(&value) {
                    Some(peer) if !peers.contains(&peer) => peers.push(peer),
                    Some(_) => {}
                    None => self.reject(format!("invalid peer address: {value}"))?,
                },
                other => tracing::trace!("Ignoring magnet parameter {other}"),
            }
        }

        let info_hash =
            info_hash.ok_or_else(|| invalid(format!("Missing or invalid info hash in {magnet_url}")))?;

        Ok(MagnetLink {
            info_hash,
            display_name,
            trackers,
            peers,
        })
    }

    fn strip_scheme<'a>(&self, magnet_url: &'a str) -> Result<&'a str, TorrentError> {
        let (scheme, rest) = magnet_url
            .split_once(':')
            .ok_or_else(|| invalid(format!("not a magnet URI: {magnet_url}")))?;

        let scheme_ok = match self.mode {
            ParseMode::Strict => scheme == "magnet",
            ParseMode::Lenient => scheme.eq_ignore_ascii_case("magnet"),
        };
        if !scheme_ok {
            return Err(invalid(format!("not a magnet URI: {magnet_url}")));
        }

        match (rest.strip_prefix('?'), self.mode) {
            (Some(query), _) => Ok(query),
            (None, ParseMode::Lenient) => Ok(rest),
            (None, ParseMode::Strict) => Err(invalid("missing '?' after magnet scheme")),
        }
    }

    /// Extracts a v1 info hash from an `xt` value. Other URN kinds are skipped.
    fn exact_topic(&self, value: &str) -> Result<Option<InfoHash>, TorrentError> {
        let hash_text = match self.mode {
            ParseMode::Strict => value.strip_prefix(BTIH_PREFIX),
            ParseMode::Lenient => value
                .get(..BTIH_PREFIX.len())
                .filter(|prefix| prefix.eq_ignore_ascii_case(BTIH_PREFIX))
                .map(|_| &value[BTIH_PREFIX.len()..]),
        };
        let Some(hash_text) = hash_text else {
            tracing::trace!("Skipping non-BitTorrent exact topic {value}");
            return Ok(None);
        };

        match parse_info_hash(hash_text) {
            Some(hash) => Ok(Some(hash)),
            None => {
                self.reject(format!(
                    "Invalid hash length or encoding: {hash_text} (expected 40 hex or 32 base32 characters)"
                ))?;
                Ok(None)
            }
        }
    }

    /// Fails in strict mode, logs and continues in lenient mode.
    fn reject(&self, reason: String) -> Result<(), TorrentError> {
        match self.mode {
            ParseMode::Strict => Err(invalid(reason)),
            ParseMode::Lenient => {
                tracing::warn!("Ignoring malformed magnet parameter: {reason}");
                Ok(())
            }
        }
    }
}

/// Parses `ip:port`, `[ipv6]:port` or `hostname:port`.
fn parse_peer(value: &str) -> Option<PeerAddress> {
    if let Ok(addr) = value.parse::<SocketAddr>() {
        return Some(PeerAddress::Socket(addr));
    }

    let (host, port) = value.rsplit_once(':')?;
    let port = port.parse::<u16>().ok()?;
    match url::Host::parse(host).ok()? {
        url::Host::Domain(host) => Some(PeerAddress::Host { host, port }),
        url::Host::Ipv4(ip) => Some(PeerAddress::Socket(SocketAddr::new(ip.into(), port))),
        url::Host::Ipv6(ip) => Some(PeerAddress::Socket(SocketAddr::new(ip.into(), port))),
    }
}

/// Decodes a 40-character hex or 32-character base32 info hash.
fn parse_info_hash(text: &str) -> Option<InfoHash> {
    match text.len() {
        40 => {
            let mut hash = [0u8; 20];
            hex::decode_to_slice(text, &mut hash).ok()?;
            Some(InfoHash::new(hash))
        }
        32 => decode_base32(text).map(InfoHash::new),
        _ => None,
    }
}

/// RFC 4648 base32 without padding, case-insensitive.
fn decode_base32(text: &str) -> Option<[u8; 20]> {
    let mut hash = [0u8; 20];
    let mut buffer: u32 = 0;
    let mut bits = 0;
    let mut written = 0;

    for symbol in text.bytes() {
        let value = match symbol.to_ascii_uppercase() {
            upper @ b'A'..=b'Z' => upper - b'A',
            digit @ b'2'..=b'7' => digit - b'2' + 26,
            _ => return None,
        };
        buffer = (buffer << 5 | u32::from(value)) & 0xFFF;
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            *hash.get_mut(written)? = (buffer >> bits) as u8;
            written += 1;
        }
    }

    (written == hash.len()).then_some(hash)
}
