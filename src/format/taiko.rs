//! The Taiko drum-game pair.
//!
//! LZ80 (type byte 0x80) is command-byte coded with three match shapes, one
//! per finder limitation:
//!
//! | command | layout | length | displacement |
//! |---|---|---|---|
//! | `0x01..=0x3F` | literal run of `c` bytes | — | — |
//! | `0x00` | extended literal run: next byte + 0x40 | — | — |
//! | `0x40..=0x7F` | 1 byte | `((c >> 4) & 3) + 2` | `(c & 0xF) + 1` |
//! | `0x80..=0xBF` | 2 bytes | `((c >> 2) & 0xF) + 3` | `((c & 3) << 8 \| b2) + 1` |
//! | `0xC0..=0xFF` | 3 bytes | `((c & 0x3F) << 1 \| b2 >> 7) + 4` | `((b2 & 0x7F) << 8 \| b3) + 1` |
//!
//! LZ81 (type byte 0x81) is a bitstream: a set flag bit carries an 8-bit
//! literal; a clear one a 15-bit `displacement - 2` and a length that is
//! either a 4-bit value (`len - 1` below 0xF) or `0xF` followed by eight
//! bits of `len - 0x10`.

use crate::core::bits::{BitOrder, BitReader, BitWriter, ByteOrder, UnitWidth};
use crate::core::error::{CodecError, ErrorContext, ErrorKind, Res};
use crate::core::parser::parse;
use crate::core::{FindLimitations, FindOptions, LzConfig, Match, PriceCalculator, Token};
use crate::format::{copy_match, read_gba_header, write_gba_header, ByteReader};

pub(crate) mod lz80 {
    use super::*;

    const TYPE_BYTE: u8 = 0x80;
    const MAX_RAW: usize = 0x13F;

    pub(crate) fn config() -> LzConfig {
        LzConfig::new(
            vec![
                FindLimitations::new(2, 5, 1, 0x10),
                FindLimitations::new(3, 0x12, 1, 0x400),
                FindLimitations::new(4, 0x83, 1, 0x8000),
            ],
            FindOptions::default(),
        )
    }

    pub(crate) struct Prices;

    impl PriceCalculator for Prices {
        fn literal_price(&self, _position: usize, _unit: &[u8]) -> u32 {
            9
        }
        fn match_price(&self, m: &Match) -> u32 {
            if m.displacement <= 0x10 && m.length <= 5 {
                8
            } else if m.displacement <= 0x400 && m.length <= 0x12 && m.length >= 3 {
                16
            } else {
                24
            }
        }
    }

    pub(crate) fn decode(input: &[u8]) -> Res<Vec<u8>> {
        let (size, body) = read_gba_header(input, TYPE_BYTE)?;
        let mut r = ByteReader::new(body);
        let mut out = Vec::with_capacity(size);
        while out.len() < size {
            let c = r.u8()?;
            let (displacement, length) = match c >> 6 {
                0 => {
                    let run = if c == 0 { usize::from(r.u8()?) + 0x40 } else { usize::from(c) };
                    if out.len() + run > size {
                        return r.malformed(format!(
                            "literal run of {} overruns the declared size {}",
                            run, size
                        ));
                    }
                    out.extend_from_slice(r.take(run)?);
                    continue;
                }
                1 => (usize::from(c & 0xF) + 1, usize::from((c >> 4) & 3) + 2),
                2 => {
                    let b2 = r.u8()?;
                    ((usize::from(c & 3) << 8 | usize::from(b2)) + 1, usize::from((c >> 2) & 0xF) + 3)
                }
                _ => {
                    let b2 = r.u8()?;
                    let b3 = r.u8()?;
                    (
                        (usize::from(b2 & 0x7F) << 8 | usize::from(b3)) + 1,
                        (usize::from(c & 0x3F) << 1 | usize::from(b2 >> 7)) + 4,
                    )
                }
            };
            if out.len() + length > size {
                return r.malformed(format!("match of {} overruns the declared size {}", length, size));
            }
            copy_match(&mut out, displacement, length)?;
        }
        Ok(out)
    }

    #[allow(clippy::indexing_slicing)]
    pub(crate) fn encode(input: &[u8], out: &mut Vec<u8>) -> Res<()> {
        write_gba_header(out, TYPE_BYTE, input.len())?;
        let tokens = parse(input, &config(), &Prices)?;
        let mut i = 0;
        while i < tokens.len() {
            match tokens[i] {
                Token::Literal { position } => {
                    let start = position;
                    let mut run = 0;
                    while i < tokens.len()
                        && run < MAX_RAW
                        && matches!(tokens[i], Token::Literal { .. })
                    {
                        run += 1;
                        i += 1;
                    }
                    if run < 0x40 {
                        out.push(run as u8);
                    } else {
                        out.push(0);
                        out.push((run - 0x40) as u8);
                    }
                    out.extend_from_slice(&input[start..start + run]);
                }
                Token::Match(m) => {
                    let d = m.displacement - 1;
                    if m.displacement <= 0x10 && m.length <= 5 && m.length >= 2 {
                        out.push(0x40 | ((m.length - 2) as u8) << 4 | d as u8);
                    } else if m.displacement <= 0x400 && m.length <= 0x12 && m.length >= 3 {
                        out.push(0x80 | ((m.length - 3) as u8) << 2 | (d >> 8) as u8);
                        out.push(d as u8);
                    } else {
                        let l = m.length - 4;
                        out.push(0xC0 | (l >> 1) as u8);
                        out.push(((l & 1) as u8) << 7 | (d >> 8) as u8);
                        out.push(d as u8);
                    }
                    i += 1;
                }
            }
        }
        Ok(())
    }
}

pub(crate) mod lz81 {
    use super::*;

    const TYPE_BYTE: u8 = 0x81;

    pub(crate) fn config() -> LzConfig {
        LzConfig::new(vec![FindLimitations::new(1, 0x102, 2, 0x8000)], FindOptions::default())
    }

    pub(crate) struct Prices;

    impl PriceCalculator for Prices {
        fn literal_price(&self, _position: usize, _unit: &[u8]) -> u32 {
            9
        }
        fn match_price(&self, m: &Match) -> u32 {
            if m.length <= 0xF {
                20
            } else {
                28
            }
        }
    }

    pub(crate) fn decode(input: &[u8]) -> Res<Vec<u8>> {
        let (size, body) = read_gba_header(input, TYPE_BYTE)?;
        let mut bits = BitReader::new(body, BitOrder::MsbFirst, ByteOrder::Le, UnitWidth::Bits8);
        let mut out = Vec::with_capacity(size);
        while out.len() < size {
            if bits.read_bit()? {
                out.push(bits.read_bits(8)? as u8);
            } else {
                let displacement = bits.read_bits(15)? as usize + 2;
                let short = bits.read_bits(4)? as usize;
                let length = if short < 0xF { short + 1 } else { bits.read_bits(8)? as usize + 0x10 };
                if out.len() + length > size {
                    return Err(CodecError::new(
                        ErrorKind::MalformedToken,
                        format!("match of {} overruns the declared size {}", length, size),
                    ));
                }
                copy_match(&mut out, displacement, length)?;
            }
        }
        Ok(out)
    }

    #[allow(clippy::indexing_slicing)]
    pub(crate) fn encode(input: &[u8], out: &mut Vec<u8>) -> Res<()> {
        write_gba_header(out, TYPE_BYTE, input.len())?;
        let tokens = parse(input, &config(), &Prices)?;
        let mut bits = BitWriter::new(BitOrder::MsbFirst, ByteOrder::Le, UnitWidth::Bits8);
        for token in &tokens {
            match token {
                Token::Literal { position } => {
                    bits.write_bit(true);
                    bits.write_bits(u32::from(input[*position]), 8);
                }
                Token::Match(m) => {
                    bits.write_bit(false);
                    bits.write_bits((m.displacement - 2) as u32, 15);
                    if m.length <= 0xF {
                        bits.write_bits((m.length - 1) as u32, 4);
                    } else {
                        bits.write_bits(0xF, 4);
                        bits.write_bits((m.length - 0x10) as u32, 8);
                    }
                }
            }
        }
        out.extend_from_slice(&bits.finish());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::Format;

    fn sample_inputs() -> Vec<Vec<u8>> {
        vec![
            Vec::new(),
            b"T".to_vec(),
            b"don don katsu don don katsu katsu".to_vec(),
            b"taiko taiko taiko drum master".repeat(17),
            vec![0x80; 0x240],
        ]
    }

    #[test_log::test]
    fn lz80_round_trips() {
        for input in sample_inputs() {
            let packed = Format::TaikoLz80.encode_from(&input).unwrap();
            assert_eq!(Format::TaikoLz80.decode_from(&packed).unwrap(), input, "len {}", input.len());
        }
    }

    #[test_log::test]
    fn lz81_round_trips() {
        for input in sample_inputs() {
            let packed = Format::TaikoLz81.encode_from(&input).unwrap();
            assert_eq!(Format::TaikoLz81.decode_from(&packed).unwrap(), input, "len {}", input.len());
        }
    }

    #[test_log::test]
    fn lz80_one_byte_matches_beat_two_byte_ones_nearby() {
        // A short period within the near window must pick the 0x40 shape.
        let input = b"xyxyxy";
        let packed = Format::TaikoLz80.encode_from(input).unwrap();
        // Header, raw run (1 cmd + 2 bytes), one short match byte.
        assert_eq!(packed.len(), 4 + 3 + 1);
        assert_eq!(Format::TaikoLz80.decode_from(&packed).unwrap(), input);
    }

    #[test_log::test]
    fn lz80_decodes_a_known_stream() {
        let packed = [0x80u8, 0x09, 0x00, 0x00, 0x03, b'a', b'b', b'c', 0x40 | 0x30 | 0x02, 0x01, b'!'];
        // Raw "abc", short match disp 3 len 5, raw "!".
        assert_eq!(lz80::decode(&packed).unwrap(), b"abcabcab!");
    }

    #[test_log::test]
    fn lz81_long_lengths_use_the_escape() {
        let input = vec![0x42u8; 0x120];
        let packed = Format::TaikoLz81.encode_from(&input).unwrap();
        assert_eq!(Format::TaikoLz81.decode_from(&packed).unwrap(), input);
        assert!(packed.len() < 0x20);
    }
}
