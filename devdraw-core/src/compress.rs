//! Back-reference compression for compressed pixel uploads (`Y`).
//!
//! The grammar has two token kinds:
//!
//! ```text
//! literal:        1ccccccc  <c+1 raw bytes>          run of 1..=128 bytes
//! back-reference: 0lllllDD  DDDDDDDD                 copy l+3 bytes (3..=34)
//!                                                    from D+1 bytes back (1..=1024)
//! ```
//!
//! The encoder only looks [`LOOKBACK`] bytes back. Searching the full
//! 1024-byte window costs more CPU than it saves on slow links.

use crate::error::DrawError;

// ── Constants ────────────────────────────────────────────────────

/// Shortest match worth a back-reference token.
pub const MIN_MATCH: usize = 3;
/// Longest match a back-reference token can encode.
pub const MAX_MATCH: usize = 34;
/// How far back the encoder searches for matches.
pub const LOOKBACK: usize = 128;
/// Longest distance a back-reference token can encode.
pub const MAX_DISTANCE: usize = 1024;
/// Longest literal run a single token can carry.
pub const MAX_LITERAL: usize = 128;

// ── Match ────────────────────────────────────────────────────────

/// A previous occurrence of the bytes at the current position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    /// Bytes back from the current position (1..=LOOKBACK).
    pub distance: usize,
    /// Matched length (MIN_MATCH..=MAX_MATCH).
    pub length: usize,
}

/// Find the longest match for the bytes starting at `pos` within the
/// lookback window.
///
/// Candidates are scanned from the most recent byte backwards and only
/// a strictly longer match replaces the current best, so ties go to
/// the closest candidate. Matches may overlap `pos`. Returns `None`
/// when nothing of at least [`MIN_MATCH`] bytes is found.
pub fn find_best_match(data: &[u8], pos: usize) -> Option<Match> {
    if pos >= data.len() {
        return None;
    }
    let limit = MAX_MATCH.min(data.len() - pos);
    if limit < MIN_MATCH {
        return None;
    }

    let mut best: Option<Match> = None;
    for distance in 1..=LOOKBACK.min(pos) {
        let start = pos - distance;
        let length = (0..limit)
            .take_while(|&j| data[start + j] == data[pos + j])
            .count();

        if length >= MIN_MATCH && best.is_none_or(|b| length > b.length) {
            best = Some(Match { distance, length });
            if length == MAX_MATCH {
                break;
            }
        }
    }
    best
}

// ── Encoding ─────────────────────────────────────────────────────

/// Compress `data` greedily, left to right.
///
/// At every position a back-reference is emitted if one exists;
/// otherwise the byte joins the pending literal run, which is only cut
/// at [`MAX_LITERAL`] bytes, at the next match, or at end of input.
pub fn compress(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + data.len() / MAX_LITERAL + 1);
    let mut literal_start = 0;
    let mut pos = 0;

    while pos < data.len() {
        match find_best_match(data, pos) {
            Some(m) => {
                push_literals(&mut out, &data[literal_start..pos]);
                push_back_reference(&mut out, m);
                pos += m.length;
                literal_start = pos;
            }
            None => {
                pos += 1;
                if pos - literal_start == MAX_LITERAL {
                    push_literals(&mut out, &data[literal_start..pos]);
                    literal_start = pos;
                }
            }
        }
    }
    push_literals(&mut out, &data[literal_start..]);
    out
}

fn push_literals(out: &mut Vec<u8>, run: &[u8]) {
    for chunk in run.chunks(MAX_LITERAL) {
        out.push(0x80 | (chunk.len() - 1) as u8);
        out.extend_from_slice(chunk);
    }
}

fn push_back_reference(out: &mut Vec<u8>, m: Match) {
    let length = (m.length - MIN_MATCH) as u8;
    let distance = (m.distance - 1) as u16;
    out.push((length << 2) | ((distance >> 8) as u8 & 0x03));
    out.push((distance & 0xFF) as u8);
}

// ── Decoding ─────────────────────────────────────────────────────

/// Expand a compressed stream back into raw bytes.
///
/// Back-references are copied byte by byte, so overlapping references
/// repeat their own output.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>, DrawError> {
    let mut out = Vec::with_capacity(data.len() * 2);
    let mut pos = 0;

    while pos < data.len() {
        let code = data[pos];
        pos += 1;

        if code & 0x80 != 0 {
            let run = (code & 0x7F) as usize + 1;
            let literal = data.get(pos..pos + run).ok_or_else(|| {
                DrawError::Protocol(format!("truncated literal run of {run} bytes"))
            })?;
            out.extend_from_slice(literal);
            pos += run;
        } else {
            let low = *data
                .get(pos)
                .ok_or_else(|| DrawError::Protocol("truncated back-reference".into()))?;
            pos += 1;

            let length = (code >> 2) as usize + MIN_MATCH;
            let distance = (((code & 0x03) as usize) << 8 | low as usize) + 1;
            if distance > out.len() {
                return Err(DrawError::Protocol(format!(
                    "back-reference {distance} bytes back with only {} decoded",
                    out.len()
                )));
            }
            let start = out.len() - distance;
            for i in 0..length {
                out.push(out[start + i]);
            }
        }
    }
    Ok(out)
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// Split a compressed stream into `(is_literal, field, payload_len)`.
    fn tokens(stream: &[u8]) -> Vec<(bool, u16, usize)> {
        let mut out = Vec::new();
        let mut pos = 0;
        while pos < stream.len() {
            let code = stream[pos];
            if code & 0x80 != 0 {
                let run = (code & 0x7F) as usize + 1;
                out.push((true, (code & 0x7F) as u16, run));
                pos += 1 + run;
            } else {
                let field = ((code as u16 & 0x03) << 8) | stream[pos + 1] as u16;
                out.push((false, (code >> 2) as u16, field as usize));
                pos += 2;
            }
        }
        out
    }

    #[test]
    fn no_match_without_history() {
        assert_eq!(find_best_match(&[1, 1, 1, 1], 0), None);
        assert_eq!(find_best_match(&[], 0), None);
    }

    #[test]
    fn repeated_byte_matches_at_distance_one() {
        let data = [7u8; 20];
        let m = find_best_match(&data, 1).unwrap();
        assert_eq!(m, Match { distance: 1, length: 19 });
    }

    #[test]
    fn match_is_clamped_to_max() {
        let data = [0xAAu8; 100];
        let m = find_best_match(&data, 50).unwrap();
        assert_eq!(m.length, MAX_MATCH);
        assert_eq!(m.distance, 1);
    }

    #[test]
    fn short_matches_are_ignored() {
        // "ab" repeats but never three bytes in a row.
        let data = b"abXabY";
        assert_eq!(find_best_match(data, 3), None);
    }

    #[test]
    fn ties_prefer_the_closest_candidate() {
        let data = b"abcdQabcdRabcd";
        let m = find_best_match(data, 10).unwrap();
        assert_eq!(m, Match { distance: 5, length: 4 });
    }

    #[test]
    fn lookback_window_is_bounded() {
        let mut data = vec![1u8, 2, 3, 4];
        data.extend(std::iter::repeat_n(9u8, LOOKBACK - 3));
        let pos = data.len();
        data.extend_from_slice(&[1, 2, 3, 4]);
        assert_eq!(pos, LOOKBACK + 1);
        assert_eq!(find_best_match(&data, pos), None);

        // One filler byte fewer puts the prefix back inside the window.
        data.remove(4);
        let m = find_best_match(&data, pos - 1).unwrap();
        assert_eq!(m, Match { distance: LOOKBACK, length: 4 });
    }

    #[test]
    fn literal_runs_are_capped() {
        let data: Vec<u8> = (0..=255u8).chain(0..44u8).map(|b| b.wrapping_mul(97)).collect();
        let out = compress(&data);
        for (literal, field, len) in tokens(&out) {
            if literal {
                assert!(field <= 127);
                assert!((1..=MAX_LITERAL).contains(&len));
            }
        }
        assert_eq!(decompress(&out).unwrap(), data);
    }

    #[test]
    fn back_reference_fields_stay_in_range() {
        let mut data = Vec::new();
        for i in 0..600u32 {
            data.push((i % 7) as u8);
            data.push((i % 5) as u8);
        }
        let out = compress(&data);
        assert!(out.len() < data.len());
        for (literal, field, payload) in tokens(&out) {
            if !literal {
                assert!(field <= 31);
                assert!(payload <= 1023);
            }
        }
        assert_eq!(decompress(&out).unwrap(), data);
    }

    #[test]
    fn solid_row_then_distinct_bytes() {
        let mut row = vec![0xFFu8; 10];
        row.extend(0u8..30);
        assert_eq!(row.len(), 40);

        let out = compress(&row);
        let toks = tokens(&out);

        // One literal 0xFF, then a back-reference covering the rest of
        // the run, then the distinct bytes as a single literal.
        assert_eq!(toks[0], (true, 0, 1));
        assert_eq!(out[1], 0xFF);
        assert_eq!(toks[1], (false, (9 - MIN_MATCH) as u16, 0));
        assert_eq!(toks[2], (true, 29, 30));
        assert_eq!(toks.len(), 3);

        // Decode by hand following the grammar.
        let mut decoded = vec![out[1]];
        let length = (out[2] >> 2) as usize + 3;
        let distance = ((((out[2] & 3) as usize) << 8) | out[3] as usize) + 1;
        for _ in 0..length {
            decoded.push(decoded[decoded.len() - distance]);
        }
        let run = (out[4] & 0x7F) as usize + 1;
        decoded.extend_from_slice(&out[5..5 + run]);
        assert_eq!(decoded, row);
    }

    #[test]
    fn decompress_rejects_bad_references() {
        assert!(decompress(&[0x00, 0x05]).is_err());
        assert!(decompress(&[0x83, 1, 2]).is_err());
        assert!(decompress(&[0x04]).is_err());
    }
}
