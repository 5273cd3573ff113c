//! Wp16: a sliding-window format whose atoms are 16-bit words. Magic
//! `Wp16`, u32 LE decompressed size, then 16-bit LE flag units consumed
//! MSB-first. A set bit copies one word verbatim; a clear bit is a u16 LE
//! reference packing `len/2 - 2` in its low five bits and `disp/2 - 1`
//! above. Everything — positions, lengths, displacements — is even in byte
//! terms, so the engine runs with `unit_size` 2 and the adapter rejects odd
//! inputs outright.

use crate::core::error::{CodecError, ErrorKind, Res};
use crate::core::parser::parse;
use crate::core::{FindLimitations, FindOptions, LzConfig, Match, PriceCalculator, Token};

const MAGIC: &[u8; 4] = b"Wp16";

/// Unit-space limitations: byte lengths [4, 0x42] and byte displacements
/// [2, 0xFFE], halved.
pub(crate) fn config() -> LzConfig {
    LzConfig::new(
        vec![FindLimitations::new(2, 0x21, 1, 0x7FF)],
        FindOptions { unit_size: 2, ..Default::default() },
    )
}

pub(crate) struct Prices;

impl PriceCalculator for Prices {
    fn literal_price(&self, _position: usize, _unit: &[u8]) -> u32 {
        17
    }
    fn match_price(&self, _m: &Match) -> u32 {
        17
    }
}

#[allow(clippy::indexing_slicing)]
pub(crate) fn decode(input: &[u8]) -> Res<Vec<u8>> {
    if input.get(..4) != Some(MAGIC.as_slice()) {
        return Err(CodecError::new(ErrorKind::MalformedToken, "missing Wp16 magic".to_string()));
    }
    let size_bytes = input
        .get(4..8)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]) as usize)
        .ok_or_else(|| CodecError::truncated("size field"))?;
    if size_bytes % 2 != 0 {
        return Err(CodecError::new(
            ErrorKind::MalformedToken,
            format!("decompressed size {} is not word aligned", size_bytes),
        ));
    }
    // Flags and payload words interleave; both are 16-bit reads, so a single
    // word cursor with a separate bit buffer keeps them in step.
    let body = &input[8..];
    let mut word_at = 0usize;
    let next_word = |word_at: &mut usize| -> Res<u16> {
        let bytes = body
            .get(*word_at..*word_at + 2)
            .ok_or_else(|| CodecError::truncated("payload word"))?;
        *word_at += 2;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    };
    let mut out = Vec::with_capacity(size_bytes);
    let mut flags = 0u16;
    let mut flags_left = 0u32;
    while out.len() < size_bytes {
        if flags_left == 0 {
            flags = next_word(&mut word_at)?;
            flags_left = 16;
        }
        let literal = flags & 0x8000 != 0;
        flags <<= 1;
        flags_left -= 1;
        let v = next_word(&mut word_at)?;
        if literal {
            out.extend_from_slice(&v.to_le_bytes());
        } else {
            let length = (usize::from(v & 0x1F) + 2) * 2;
            let displacement = (usize::from(v >> 5) + 1) * 2;
            if out.len() + length > size_bytes {
                return Err(CodecError::new(
                    ErrorKind::MalformedToken,
                    format!("match of {} overruns the declared size {}", length, size_bytes),
                ));
            }
            if displacement > out.len() {
                return Err(CodecError::new(
                    ErrorKind::MalformedToken,
                    format!("displacement {} with only {} bytes decoded", displacement, out.len()),
                ));
            }
            for _ in 0..length {
                let b = out[out.len() - displacement];
                out.push(b);
            }
        }
    }
    Ok(out)
}

#[allow(clippy::indexing_slicing)]
pub(crate) fn encode(input: &[u8], out: &mut Vec<u8>) -> Res<()> {
    if input.len() % 2 != 0 {
        return Err(CodecError::new(
            ErrorKind::InvalidRange,
            format!("input of {} bytes is not word aligned", input.len()),
        ));
    }
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&(input.len() as u32).to_le_bytes());
    let tokens = parse(input, &config(), &Prices)?;

    // Emit in groups of up to sixteen tokens: the flag word, then the
    // tokens' payload words.
    for group in tokens.chunks(16) {
        let mut flags = 0u16;
        let mut payload = Vec::with_capacity(group.len() * 2);
        for (slot, token) in group.iter().enumerate() {
            match token {
                Token::Literal { position } => {
                    flags |= 0x8000 >> slot;
                    payload.extend_from_slice(&input[position * 2..position * 2 + 2]);
                }
                Token::Match(m) => {
                    let v = ((m.displacement - 1) as u16) << 5 | (m.length - 2) as u16;
                    payload.extend_from_slice(&v.to_le_bytes());
                }
            }
        }
        out.extend_from_slice(&flags.to_le_bytes());
        out.extend_from_slice(&payload);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::Format;

    #[test_log::test]
    fn round_trips() {
        let inputs: Vec<Vec<u8>> = vec![
            Vec::new(),
            b"hi".to_vec(),
            b"wordwordwordword".to_vec(),
            b"16-bit units all the way down ".repeat(16),
            vec![0xEE; 0x400],
        ];
        for input in inputs {
            let packed = Format::Wp16.encode_from(&input).unwrap();
            assert_eq!(Format::Wp16.decode_from(&packed).unwrap(), input, "len {}", input.len());
        }
    }

    #[test_log::test]
    fn odd_length_input_is_rejected() {
        let err = Format::Wp16.encode_from(b"odd").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidRange);
    }

    #[test_log::test]
    fn all_geometry_is_even_in_byte_terms() {
        let input = b"wordwordwordword";
        let tokens = parse(input, &config(), &Prices).unwrap();
        for t in &tokens {
            if let Token::Match(m) = t {
                assert_eq!((m.length * 2) % 2, 0);
                assert!(m.length * 2 >= 4 && m.length * 2 <= 0x42);
                assert!(m.displacement * 2 >= 2 && m.displacement * 2 <= 0xFFE);
            }
        }
        assert!(tokens.iter().any(|t| matches!(t, Token::Match(_))));
    }

    #[test_log::test]
    fn a_misaligned_repetition_is_not_matchable() {
        // "ab" repeating at odd byte offsets only: unit view sees distinct
        // words, so everything is literal.
        let input = b"xabaxbab";
        let tokens = parse(input, &config(), &Prices).unwrap();
        assert!(tokens.iter().all(|t| matches!(t, Token::Literal { .. })));
    }
}
