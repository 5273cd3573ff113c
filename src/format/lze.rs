//! Lze: two-bit token flags packed four to a byte, MSB pair first, after a
//! u32 LE decompressed size. Flag values:
//!
//! * `0` — long match: u16 LE, length `(v >> 12) + 3`, displacement
//!   `(v & 0xFFF) + 5`.
//! * `1` — short match: one byte, displacement `(b >> 6) + 1`, length
//!   `(b & 0x3F) + 2`.
//! * `2` — one literal byte.
//! * `3` — three literal bytes.
//!
//! The two match shapes install two independent limitations on the finder;
//! a candidate only needs to satisfy one of them.

use crate::core::error::{CodecError, ErrorKind, Res};
use crate::core::parser::parse;
use crate::core::{FindLimitations, FindOptions, LzConfig, Match, PriceCalculator, Token};
use crate::format::{copy_match, ByteReader};

pub(crate) fn config() -> LzConfig {
    LzConfig::new(
        vec![FindLimitations::new(3, 0x12, 5, 0x1004), FindLimitations::new(2, 0x41, 1, 4)],
        FindOptions::default(),
    )
}

pub(crate) struct Prices;

impl PriceCalculator for Prices {
    fn literal_price(&self, _position: usize, _unit: &[u8]) -> u32 {
        // Two flag bits and the byte; runs of three share one flag, so this
        // sits between the lone (10) and grouped (26/3) costs.
        9
    }
    fn match_price(&self, m: &Match) -> u32 {
        // Displacements 1..=4 can only be the short shape; 5 and up can only
        // be the long one.
        if m.displacement <= 4 {
            10
        } else {
            18
        }
    }
}

pub(crate) fn decode(input: &[u8]) -> Res<Vec<u8>> {
    let mut r = ByteReader::new(input);
    let size = r.u32_le()? as usize;
    let mut out = Vec::with_capacity(size);
    let mut flags = 0u8;
    let mut flags_left = 0u8;
    while out.len() < size {
        if flags_left == 0 {
            flags = r.u8()?;
            flags_left = 4;
        }
        let flag = flags >> 6;
        flags <<= 2;
        flags_left -= 1;
        let (displacement, length) = match flag {
            0 => {
                let v = r.u16_le()?;
                (usize::from(v & 0xFFF) + 5, usize::from(v >> 12) + 3)
            }
            1 => {
                let b = r.u8()?;
                (usize::from(b >> 6) + 1, usize::from(b & 0x3F) + 2)
            }
            literal_run => {
                let run = if literal_run == 2 { 1 } else { 3 };
                if out.len() + run > size {
                    return Err(CodecError::new(
                        ErrorKind::MalformedToken,
                        format!("literal run of {} overruns the declared size {}", run, size),
                    ));
                }
                out.extend_from_slice(r.take(run)?);
                continue;
            }
        };
        if out.len() + length > size {
            return Err(CodecError::new(
                ErrorKind::MalformedToken,
                format!("match of {} overruns the declared size {}", length, size),
            ));
        }
        copy_match(&mut out, displacement, length)?;
    }
    Ok(out)
}

/// Flags and payloads interleave per four-token group: the flag byte, then
/// its tokens' payload bytes.
#[allow(clippy::indexing_slicing)]
pub(crate) fn encode(input: &[u8], out: &mut Vec<u8>) -> Res<()> {
    out.extend_from_slice(&(input.len() as u32).to_le_bytes());
    let tokens = parse(input, &config(), &Prices)?;

    let mut pieces: Vec<(u8, Vec<u8>)> = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        match tokens[i] {
            Token::Literal { position } => {
                let mut run = 0;
                while i + run < tokens.len() && matches!(tokens[i + run], Token::Literal { .. }) {
                    run += 1;
                }
                if run >= 3 {
                    pieces.push((3, input[position..position + 3].to_vec()));
                    i += 3;
                } else {
                    pieces.push((2, vec![input[position]]));
                    i += 1;
                }
            }
            Token::Match(m) => {
                if m.displacement <= 4 {
                    let b = ((m.displacement - 1) as u8) << 6 | (m.length - 2) as u8;
                    pieces.push((1, vec![b]));
                } else {
                    let v = ((m.length - 3) as u16) << 12 | (m.displacement - 5) as u16;
                    pieces.push((0, v.to_le_bytes().to_vec()));
                }
                i += 1;
            }
        }
    }

    for group in pieces.chunks(4) {
        let mut flags = 0u8;
        for (slot, (flag, _)) in group.iter().enumerate() {
            flags |= flag << (6 - 2 * slot);
        }
        out.push(flags);
        for (_, payload) in group {
            out.extend_from_slice(payload);
        }
    }
    Ok(())
}
