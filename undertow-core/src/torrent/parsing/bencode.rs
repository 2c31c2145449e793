//! Metainfo decoding and info hash calculation

use std::collections::{HashMap, HashSet};
use std::ops::Range;

use sha1::{Digest, Sha1};

use super::types::{TorrentFile, TorrentMetadata};
use crate::torrent::{InfoHash, TorrentError};

type BencodeDict<'a> = HashMap<&'a [u8], bencode_rs::Value<'a>>;
type ParseResult<T> = Result<T, TorrentError>;

fn invalid(reason: impl Into<String>) -> TorrentError {
    TorrentError::InvalidTorrentFile {
        reason: reason.into(),
    }
}

/// Decodes `.torrent` documents into [`TorrentMetadata`].
pub struct MetainfoDecoder;

impl MetainfoDecoder {
    /// Decodes a complete metainfo document.
    ///
    /// # Errors
    ///
    /// - `TorrentError::InvalidTorrentFile` - Malformed bencode or missing required fields
    pub fn decode(torrent_bytes: &[u8]) -> ParseResult<TorrentMetadata> {
        let parsed = bencode_rs::Value::parse(torrent_bytes)
            .map_err(|e| invalid(format!("Bencode parsing failed: {e:?}")))?;

        let Some(bencode_rs::Value::Dictionary(root)) = parsed.first() else {
            return Err(invalid("Root element must be dictionary"));
        };
        let Some(bencode_rs::Value::Dictionary(info)) = root.get(b"info".as_slice()) else {
            return Err(invalid("Missing 'info' field"));
        };

        let info_hash = Self::info_hash(torrent_bytes)?;
        let name = Self::string_field(info, b"name")?;

        let piece_length = Self::integer_field(info, b"piece length")?;
        let piece_length = u32::try_from(piece_length)
            .ok()
            .filter(|&length| length > 0)
            .ok_or_else(|| invalid(format!("Invalid piece length: {piece_length}")))?;

        let pieces = Self::bytes_field(info, b"pieces")?;
        if pieces.len() % 20 != 0 {
            return Err(invalid("Invalid pieces length"));
        }
        let piece_hashes = pieces
            .chunks_exact(20)
            .map(|chunk| {
                let mut hash = [0u8; 20];
                hash.copy_from_slice(chunk);
                hash
            })
            .collect();

        let files = match (info.get(b"length".as_slice()), info.get(b"files".as_slice())) {
            (Some(bencode_rs::Value::Integer(length)), _) => vec![TorrentFile {
                path: vec![name.clone()],
                length: Self::non_negative(*length, "length")?,
            }],
            (None, Some(bencode_rs::Value::List(entries))) => Self::file_list(entries)?,
            _ => return Err(invalid("Missing 'files' or 'length' field")),
        };
        let total_length = files.iter().map(|file| file.length).sum();

        Ok(TorrentMetadata {
            info_hash,
            name,
            piece_length,
            piece_hashes,
            total_length,
            files,
            announce_urls: Self::announce_urls(root),
        })
    }

    /// SHA-1 over the exact bytes of the top-level `info` value.
    fn info_hash(torrent_bytes: &[u8]) -> ParseResult<InfoHash> {
        let span = Self::info_span(torrent_bytes)?;
        let digest = Sha1::digest(&torrent_bytes[span]);

        let mut hash = [0u8; 20];
        hash.copy_from_slice(&digest);
        Ok(InfoHash::new(hash))
    }

    /// Locates the `info` value by walking the keys of the root dictionary,
    /// so an `info` key nested elsewhere cannot be mistaken for it.
    ///
    /// Duplicate root keys are rejected: the decoded map keeps only one of
    /// them, and the hashed span must be the one that was decoded.
    pub(crate) fn info_span(data: &[u8]) -> ParseResult<Range<usize>> {
        if data.first() != Some(&b'd') {
            return Err(invalid("Expected dictionary start"));
        }

        let mut keys: HashSet<&[u8]> = HashSet::new();
        let mut info = None;
        let mut pos = 1;
        while data.get(pos) != Some(&b'e') {
            let key_end = Self::value_end(data, pos)?;
            let key = Self::string_contents(data, pos..key_end)?;
            let value_end = Self::value_end(data, key_end)?;
            if !keys.insert(key) {
                return Err(invalid(format!(
                    "Duplicate key in root dictionary: {:?}",
                    String::from_utf8_lossy(key)
                )));
            }
            if key == b"info" {
                info = Some(key_end..value_end);
            }
            pos = value_end;
        }

        info.ok_or_else(|| invalid("Missing 'info' field"))
    }

    /// Returns the offset one past the bencode value starting at `pos`.
    pub(crate) fn value_end(data: &[u8], pos: usize) -> ParseResult<usize> {
        match data.get(pos) {
            Some(b'i') => data[pos..]
                .iter()
                .position(|&b| b == b'e')
                .map(|offset| pos + offset + 1)
                .ok_or_else(|| invalid("Unterminated integer")),
            Some(b'l') | Some(b'd') => {
                let mut cursor = pos + 1;
                loop {
                    match data.get(cursor) {
                        Some(b'e') => return Ok(cursor + 1),
                        Some(_) => cursor = Self::value_end(data, cursor)?,
                        None => return Err(invalid("Incomplete bencode container")),
                    }
                }
            }
            Some(b'0'..=b'9') => {
                let colon = data[pos..]
                    .iter()
                    .position(|&b| b == b':')
                    .map(|offset| pos + offset)
                    .ok_or_else(|| invalid("Invalid string format"))?;
                let length: usize = std::str::from_utf8(&data[pos..colon])
                    .ok()
                    .and_then(|digits| digits.parse().ok())
                    .ok_or_else(|| invalid("Invalid string length"))?;
                colon
                    .checked_add(1)
                    .and_then(|start| start.checked_add(length))
                    .filter(|&end| end <= data.len())
                    .ok_or_else(|| invalid("String exceeds input"))
            }
            Some(_) => Err(invalid("Invalid bencode character")),
            None => Err(invalid("Unexpected end of input")),
        }
    }

    fn string_contents(data: &[u8], span: Range<usize>) -> ParseResult<&[u8]> {
        let raw = &data[span];
        raw.iter()
            .position(|&b| b == b':')
            .map(|colon| &raw[colon + 1..])
            .ok_or_else(|| invalid("Dictionary key must be a string"))
    }

    fn bytes_field<'a>(dict: &'a BencodeDict<'_>, key: &[u8]) -> ParseResult<&'a [u8]> {
        match dict.get(key) {
            Some(bencode_rs::Value::Bytes(bytes)) => Ok(bytes),
            _ => Err(invalid(format!(
                "Missing or invalid field: {:?}",
                String::from_utf8_lossy(key)
            ))),
        }
    }

    fn string_field(dict: &BencodeDict<'_>, key: &[u8]) -> ParseResult<String> {
        let bytes = Self::bytes_field(dict, key)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| {
            invalid(format!(
                "Invalid UTF-8 in field: {:?}",
                String::from_utf8_lossy(key)
            ))
        })
    }

    fn integer_field(dict: &BencodeDict<'_>, key: &[u8]) -> ParseResult<i64> {
        match dict.get(key) {
            Some(bencode_rs::Value::Integer(value)) => Ok(*value),
            _ => Err(invalid(format!(
                "Missing or invalid integer field: {:?}",
                String::from_utf8_lossy(key)
            ))),
        }
    }

    fn non_negative(value: i64, field: &str) -> ParseResult<u64> {
        u64::try_from(value).map_err(|_| invalid(format!("Negative {field}: {value}")))
    }

    fn file_list(entries: &[bencode_rs::Value<'_>]) -> ParseResult<Vec<TorrentFile>> {
        entries
            .iter()
            .map(|entry| {
                let bencode_rs::Value::Dictionary(file) = entry else {
                    return Err(invalid("Invalid file entry type"));
                };
                let length = Self::non_negative(Self::integer_field(file, b"length")?, "length")?;

                let Some(bencode_rs::Value::List(components)) = file.get(b"path".as_slice()) else {
                    return Err(invalid("Missing or invalid path in file"));
                };
                let path = components
                    .iter()
                    .map(|component| match component {
                        bencode_rs::Value::Bytes(bytes) => String::from_utf8(bytes.to_vec())
                            .map_err(|_| invalid("Invalid UTF-8 in file path")),
                        _ => Err(invalid("Invalid path component type")),
                    })
                    .collect::<ParseResult<Vec<String>>>()?;

                Ok(TorrentFile { path, length })
            })
            .collect()
    }

    /// `announce` first, then every tier of `announce-list`, without duplicates.
    ///
    /// Trackerless torrents yield an empty list.
    fn announce_urls(root: &BencodeDict<'_>) -> Vec<String> {
        let mut urls: Vec<String> = Vec::new();
        let mut push = |bytes: &[u8]| {
            if let Ok(url) = std::str::from_utf8(bytes) {
                if !url.is_empty() && !urls.iter().any(|known| known == url) {
                    urls.push(url.to_string());
                }
            }
        };

        if let Some(bencode_rs::Value::Bytes(announce)) = root.get(b"announce".as_slice()) {
            push(announce);
        }
        if let Some(bencode_rs::Value::List(tiers)) = root.get(b"announce-list".as_slice()) {
            for tier in tiers {
                if let bencode_rs::Value::List(tier_urls) = tier {
                    for url in tier_urls {
                        if let bencode_rs::Value::Bytes(url) = url {
                            push(url);
                        }
                    }
                }
            }
        }

        urls
    }
}
