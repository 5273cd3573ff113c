//! Generic LZ77 and the end-anchored backward variant.
//!
//! Forward LZ77 is a pure bitstream: a u32 LE decompressed size, then
//! MSB-first bits where a clear flag introduces an 8-bit literal and a set
//! flag an 8-bit displacement, 8-bit length and the 8-bit byte that follows
//! the copy (the classic next-char slot — which is why the parser runs with
//! one forced literal after every match). A match that ends the stream pads
//! the slot with zero.
//!
//! Backward LZ77 compresses the stream from its tail, the way DS binaries
//! are overlaid in place. The body holds LZ10-style tokens over the reversed
//! data and is stored reversed, and the stream ends with an 8-byte footer:
//! a u32 LE whose low 24 bits give the length of the compressed region
//! (including the footer) and whose high byte is the footer length, then an
//! i32 LE delta from stream length to decompressed length. Bytes before the
//! compressed region are kept verbatim.

use crate::core::bits::{BitOrder, BitReader, BitWriter, ByteOrder, UnitWidth};
use crate::core::error::{CodecError, ErrorKind, Res};
use crate::core::parser::parse;
use crate::core::{Direction, FindLimitations, FindOptions, LzConfig, Match, PriceCalculator, Token};
use crate::format::{copy_match, ByteReader};

pub(crate) mod forward {
    use super::*;

    pub(crate) fn config() -> LzConfig {
        LzConfig::new(
            vec![FindLimitations::new(1, 0xFF, 1, 0xFF)],
            FindOptions { skip_units_after_match: 1, ..Default::default() },
        )
    }

    pub(crate) struct Prices;

    impl PriceCalculator for Prices {
        fn literal_price(&self, _position: usize, _unit: &[u8]) -> u32 {
            9
        }
        fn match_price(&self, _m: &Match) -> u32 {
            // Flag, displacement and length; the embedded next byte is
            // accounted by the forced literal that follows.
            17
        }
    }

    #[allow(clippy::indexing_slicing)]
    pub(crate) fn decode(input: &[u8]) -> Res<Vec<u8>> {
        let mut r = ByteReader::new(input);
        let size = r.u32_le()? as usize;
        let mut bits = BitReader::new(&input[4..], BitOrder::MsbFirst, ByteOrder::Le, UnitWidth::Bits8);
        let mut out = Vec::with_capacity(size);
        while out.len() < size {
            if bits.read_bit()? {
                let displacement = bits.read_bits(8)? as usize;
                let length = bits.read_bits(8)? as usize;
                if displacement == 0 || length == 0 {
                    return Err(CodecError::new(
                        ErrorKind::MalformedToken,
                        format!("null reference ({}, {})", displacement, length),
                    ));
                }
                if out.len() + length > size {
                    return Err(CodecError::new(
                        ErrorKind::MalformedToken,
                        format!("match of {} overruns the declared size {}", length, size),
                    ));
                }
                copy_match(&mut out, displacement, length)?;
                let next = bits.read_bits(8)? as u8;
                if out.len() < size {
                    out.push(next);
                }
            } else {
                out.push(bits.read_bits(8)? as u8);
            }
        }
        Ok(out)
    }

    #[allow(clippy::indexing_slicing)]
    pub(crate) fn encode(input: &[u8], out: &mut Vec<u8>) -> Res<()> {
        out.extend_from_slice(&(input.len() as u32).to_le_bytes());
        let tokens = parse(input, &config(), &Prices)?;
        let mut bits = BitWriter::new(BitOrder::MsbFirst, ByteOrder::Le, UnitWidth::Bits8);
        let mut i = 0;
        while i < tokens.len() {
            match tokens[i] {
                Token::Literal { position } => {
                    bits.write_bit(false);
                    bits.write_bits(u32::from(input[position]), 8);
                    i += 1;
                }
                Token::Match(m) => {
                    bits.write_bit(true);
                    bits.write_bits(m.displacement as u32, 8);
                    bits.write_bits(m.length as u32, 8);
                    // The forced literal rides inside the match token.
                    let next = match tokens.get(i + 1) {
                        Some(Token::Literal { position }) => input[*position],
                        _ => 0,
                    };
                    bits.write_bits(u32::from(next), 8);
                    i += if matches!(tokens.get(i + 1), Some(Token::Literal { .. })) { 2 } else { 1 };
                }
            }
        }
        out.extend_from_slice(&bits.finish());
        Ok(())
    }
}

pub(crate) mod backward {
    use super::*;

    const FOOTER_LEN: usize = 8;

    pub(crate) fn config() -> LzConfig {
        LzConfig::new(
            vec![FindLimitations::new(3, 0x12, 3, 0x1002)],
            FindOptions { direction: Direction::Backward, ..Default::default() },
        )
    }

    pub(crate) struct Prices;

    impl PriceCalculator for Prices {
        fn literal_price(&self, _position: usize, _unit: &[u8]) -> u32 {
            9
        }
        fn match_price(&self, _m: &Match) -> u32 {
            17
        }
    }

    #[allow(clippy::indexing_slicing)]
    pub(crate) fn decode(input: &[u8]) -> Res<Vec<u8>> {
        if input.len() < FOOTER_LEN {
            return Err(CodecError::truncated("backward footer"));
        }
        let at = input.len() - FOOTER_LEN;
        let buffer_info = u32::from_le_bytes([input[at], input[at + 1], input[at + 2], input[at + 3]]);
        let delta = i32::from_le_bytes([input[at + 4], input[at + 5], input[at + 6], input[at + 7]]);
        let footer = (buffer_info >> 24) as usize;
        let region = (buffer_info & 0xFF_FFFF) as usize;
        if footer != FOOTER_LEN || region < FOOTER_LEN || region > input.len() {
            return Err(CodecError::new(
                ErrorKind::MalformedToken,
                format!("bad footer: region {}, footer {}", region, footer),
            ));
        }
        let prefix = &input[..input.len() - region];
        let size = input.len() as i64 + i64::from(delta);
        if size < prefix.len() as i64 {
            return Err(CodecError::new(
                ErrorKind::MalformedToken,
                format!("decompressed size {} smaller than the verbatim prefix", size),
            ));
        }
        let size = size as usize;
        let body: Vec<u8> = input[input.len() - region..input.len() - FOOTER_LEN]
            .iter()
            .rev()
            .copied()
            .collect();

        let tail_size = size - prefix.len();
        let mut r = ByteReader::new(&body);
        let mut tail = Vec::with_capacity(tail_size);
        let mut mask = 0u8;
        let mut flags = 0u8;
        while tail.len() < tail_size {
            if mask == 0 {
                flags = r.u8()?;
                mask = 0x80;
            }
            if flags & mask == 0 {
                tail.push(r.u8()?);
            } else {
                let b1 = r.u8()?;
                let b2 = r.u8()?;
                let length = usize::from(b1 >> 4) + 3;
                let displacement = (usize::from(b1 & 0xF) << 8 | usize::from(b2)) + 3;
                if tail.len() + length > tail_size {
                    return Err(CodecError::new(
                        ErrorKind::MalformedToken,
                        format!("match of {} overruns the tail size {}", length, tail_size),
                    ));
                }
                copy_match(&mut tail, displacement, length)?;
            }
            mask >>= 1;
        }

        let mut out = prefix.to_vec();
        out.extend(tail.iter().rev());
        Ok(out)
    }

    #[allow(clippy::indexing_slicing)]
    pub(crate) fn encode(input: &[u8], out: &mut Vec<u8>) -> Res<()> {
        // Tokens live over the reversed input; serialize against that view.
        let reversed: Vec<u8> = input.iter().rev().copied().collect();
        let tokens = parse(input, &config(), &Prices)?;
        let mut body = Vec::new();
        let mut mask = 0u8;
        let mut flag_at = 0usize;
        for token in &tokens {
            if mask == 0 {
                flag_at = body.len();
                body.push(0);
                mask = 0x80;
            }
            match token {
                Token::Literal { position } => body.push(reversed[*position]),
                Token::Match(m) => {
                    body[flag_at] |= mask;
                    let d = m.displacement - 3;
                    body.push(((m.length - 3) as u8) << 4 | (d >> 8) as u8);
                    body.push(d as u8);
                }
            }
            mask >>= 1;
        }
        let total = body.len() + FOOTER_LEN;
        if total > 0xFF_FFFF {
            return Err(CodecError::new(
                ErrorKind::InvalidRange,
                format!("compressed region of {} does not fit the footer field", total),
            ));
        }
        out.extend(body.iter().rev());
        out.extend_from_slice(&((total as u32) | (FOOTER_LEN as u32) << 24).to_le_bytes());
        let delta = input.len() as i64 - total as i64;
        out.extend_from_slice(&(delta as i32).to_le_bytes());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::Format;

    #[test_log::test]
    fn forward_round_trips() {
        let inputs: Vec<Vec<u8>> = vec![
            Vec::new(),
            b"Z".to_vec(),
            b"ABCABC".to_vec(),
            b"seven seas of rhye, seven seas of rhye".repeat(4),
            vec![3u8; 0x140],
        ];
        for input in inputs {
            let packed = Format::Lz77.encode_from(&input).unwrap();
            assert_eq!(Format::Lz77.decode_from(&packed).unwrap(), input);
        }
    }

    #[test_log::test]
    fn forward_embeds_the_byte_after_each_match() {
        // "ABCABC": three literals then a match ending the stream, so the
        // next-char slot is padding: 3*9 + 25 bits round up to 7 bytes.
        let packed = Format::Lz77.encode_from(b"ABCABC").unwrap();
        assert_eq!(packed.len(), 4 + 7);
        assert_eq!(Format::Lz77.decode_from(&packed).unwrap(), b"ABCABC");
    }

    #[test_log::test]
    fn backward_round_trips() {
        let palindrome: Vec<u8> = {
            let half: Vec<u8> = (0..512u32).map(|i| (i % 7) as u8 + b'a').collect();
            let mut v = half.clone();
            v.extend(half.iter().rev());
            v
        };
        let inputs: Vec<Vec<u8>> = vec![
            Vec::new(),
            b"B".to_vec(),
            palindrome,
            b"backwards backwards backwards".repeat(8),
            vec![0u8; 0x500],
        ];
        for input in inputs {
            let packed = Format::BackwardLz77.encode_from(&input).unwrap();
            assert_eq!(Format::BackwardLz77.decode_from(&packed).unwrap(), input, "len {}", input.len());
        }
    }

    #[test_log::test]
    fn backward_streams_end_with_the_footer() {
        let packed = Format::BackwardLz77.encode_from(&vec![1u8; 64]).unwrap();
        let at = packed.len() - 8;
        let info = u32::from_le_bytes([packed[at], packed[at + 1], packed[at + 2], packed[at + 3]]);
        assert_eq!(info >> 24, 8);
        assert_eq!((info & 0xFF_FFFF) as usize, packed.len());
    }

    #[test_log::test]
    fn backward_rejects_a_broken_footer() {
        let mut packed = Format::BackwardLz77.encode_from(b"some data to pack").unwrap();
        let at = packed.len() - 5;
        packed[at] = 0x77;
        let err = Format::BackwardLz77.decode_from(&packed).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MalformedToken);
    }
}
