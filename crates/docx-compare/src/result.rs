//! Top-level result shapes returned by `compare_ooxml` (§6).

use serde::{Deserialize, Serialize};

/// Per-category operation counts; `total = insertions + deletions + moves`,
/// with a move pair counted once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareStats {
    pub insertions: usize,
    pub deletions: usize,
    pub moves: usize,
    pub total: usize,
}

impl CompareStats {
    pub fn new(insertions: usize, deletions: usize, moves: usize) -> Self {
        Self {
            insertions,
            deletions,
            moves,
            total: insertions + deletions + moves,
        }
    }
}

/// Alignment metadata: the paragraph-level pairs produced by C3, the total
/// number of revision operations materialized by C5, and any warnings
/// recorded by the coarse-fallback failure path (§4.5).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareMeta {
    pub pairs: Vec<(i64, i64)>,
    pub operation_count: usize,
    pub warnings: Vec<String>,
}

/// The full result of one `compare_ooxml` invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareResult {
    #[serde(with = "serde_bytes_as_base64", rename = "documentBytes")]
    pub document_bytes: Vec<u8>,
    pub stats: CompareStats,
    pub meta: CompareMeta,
}

/// `document_bytes` is a raw OOXML package; base64-encode it for the JSON
/// wire contract rather than emitting a numeric array.
mod serde_bytes_as_base64 {
    use serde::{Deserialize, Deserializer, Serializer};

    const TABLE: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        decode(&s).map_err(serde::de::Error::custom)
    }

    fn encode(bytes: &[u8]) -> String {
        let mut out = String::with_capacity((bytes.len() + 2) / 3 * 4);
        for chunk in bytes.chunks(3) {
            let b0 = chunk[0];
            let b1 = *chunk.get(1).unwrap_or(&0);
            let b2 = *chunk.get(2).unwrap_or(&0);
            out.push(TABLE[(b0 >> 2) as usize] as char);
            out.push(TABLE[(((b0 & 0x03) << 4) | (b1 >> 4)) as usize] as char);
            out.push(if chunk.len() > 1 { TABLE[(((b1 & 0x0f) << 2) | (b2 >> 6)) as usize] as char } else { '=' });
            out.push(if chunk.len() > 2 { TABLE[(b2 & 0x3f) as usize] as char } else { '=' });
        }
        out
    }

    fn decode(s: &str) -> Result<Vec<u8>, String> {
        fn val(c: u8) -> Result<u8, String> {
            match c {
                b'A'..=b'Z' => Ok(c - b'A'),
                b'a'..=b'z' => Ok(c - b'a' + 26),
                b'0'..=b'9' => Ok(c - b'0' + 52),
                b'+' => Ok(62),
                b'/' => Ok(63),
                _ => Err(format!("invalid base64 byte: {c}")),
            }
        }
        let clean: Vec<u8> = s.bytes().filter(|&b| b != b'=').collect();
        let mut out = Vec::with_capacity(clean.len() * 3 / 4);
        for chunk in clean.chunks(4) {
            let mut buf = [0u8; 4];
            for (i, &c) in chunk.iter().enumerate() {
                buf[i] = val(c)?;
            }
            out.push((buf[0] << 2) | (buf[1] >> 4));
            if chunk.len() > 2 {
                out.push((buf[1] << 4) | (buf[2] >> 2));
            }
            if chunk.len() > 3 {
                out.push((buf[2] << 6) | buf[3]);
            }
        }
        Ok(out)
    }

}
