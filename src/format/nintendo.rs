//! The GBA/DS BIOS sliding-window family: LZ10, LZ11 and LZ40/LZ60.
//!
//! All four share the one-byte-type + u24-LE-size header and MSB-first flag
//! bytes where a set bit announces a back-reference. They differ only in how
//! the reference packs its length and displacement:
//!
//! * LZ10: `(len-3) << 4 | hi(disp-1)`, `lo(disp-1)` — lengths 3..=0x12.
//! * LZ11: the same 12-bit displacement with one-, two- or three-nibble
//!   length escapes reaching 0x10110.
//! * LZ40/LZ60: a little-endian word holding the displacement in its low 12
//!   bits and a length nibble with byte/word escapes reaching 0x1010F.

use crate::core::error::{ErrorContext, ErrorKind, Res};
use crate::core::parser::parse;
use crate::core::{FindLimitations, FindOptions, LzConfig, Match, PriceCalculator, Token};
use crate::format::{copy_match, read_gba_header, write_gba_header, ByteReader};

pub(crate) mod lz10 {
    use super::*;

    const TYPE_BYTE: u8 = 0x10;

    pub(crate) fn config() -> LzConfig {
        LzConfig::new(vec![FindLimitations::new(3, 0x12, 1, 0x1000)], FindOptions::default())
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

    pub(crate) fn decode(input: &[u8]) -> Res<Vec<u8>> {
        let (size, body) = read_gba_header(input, TYPE_BYTE)?;
        let mut r = ByteReader::new(body);
        let mut out = Vec::with_capacity(size);
        let mut mask = 0u8;
        let mut flags = 0u8;
        while out.len() < size {
            if mask == 0 {
                flags = r.u8()?;
                mask = 0x80;
            }
            if flags & mask == 0 {
                out.push(r.u8()?);
            } else {
                let b1 = r.u8()?;
                let b2 = r.u8()?;
                let length = usize::from(b1 >> 4) + 3;
                let displacement = (usize::from(b1 & 0xF) << 8 | usize::from(b2)) + 1;
                if out.len() + length > size {
                    return r.malformed(format!(
                        "match of {} overruns the declared size {}",
                        length, size
                    ));
                }
                copy_match(&mut out, displacement, length)?;
            }
            mask >>= 1;
        }
        Ok(out)
    }

    #[allow(clippy::indexing_slicing)]
    pub(crate) fn encode(input: &[u8], out: &mut Vec<u8>) -> Res<()> {
        write_gba_header(out, TYPE_BYTE, input.len())?;
        let tokens = parse(input, &config(), &Prices)?;
        let mut mask = 0u8;
        let mut flag_at = 0usize;
        for token in &tokens {
            if mask == 0 {
                flag_at = out.len();
                out.push(0);
                mask = 0x80;
            }
            match token {
                Token::Literal { position } => out.push(input[*position]),
                Token::Match(m) => {
                    out[flag_at] |= mask;
                    let d = m.displacement - 1;
                    out.push(((m.length - 3) as u8) << 4 | (d >> 8) as u8);
                    out.push(d as u8);
                }
            }
            mask >>= 1;
        }
        Ok(())
    }
}

pub(crate) mod lz11 {
    use super::*;

    const TYPE_BYTE: u8 = 0x11;

    pub(crate) fn config() -> LzConfig {
        LzConfig::new(vec![FindLimitations::new(3, 0x10110, 1, 0x1000)], FindOptions::default())
    }

    pub(crate) struct Prices;

    impl PriceCalculator for Prices {
        fn literal_price(&self, _position: usize, _unit: &[u8]) -> u32 {
            9
        }
        fn match_price(&self, m: &Match) -> u32 {
            match m.length {
                ..=0x10 => 17,
                ..=0x110 => 25,
                _ => 33,
            }
        }
    }

    pub(crate) fn decode(input: &[u8]) -> Res<Vec<u8>> {
        let (size, body) = read_gba_header(input, TYPE_BYTE)?;
        let mut r = ByteReader::new(body);
        let mut out = Vec::with_capacity(size);
        let mut mask = 0u8;
        let mut flags = 0u8;
        while out.len() < size {
            if mask == 0 {
                flags = r.u8()?;
                mask = 0x80;
            }
            if flags & mask == 0 {
                out.push(r.u8()?);
            } else {
                let initial = usize::from(r.u16_be()?);
                let (displacement, length) = match initial >> 12 {
                    0 => {
                        let v = (initial & 0xFFF) << 8 | usize::from(r.u8()?);
                        ((v & 0xFFF) + 1, (v >> 12) + 0x11)
                    }
                    1 => {
                        let v = (initial & 0xFFF) << 16 | usize::from(r.u16_be()?);
                        ((v & 0xFFF) + 1, (v >> 12) + 0x111)
                    }
                    n => ((initial & 0xFFF) + 1, n + 1),
                };
                if out.len() + length > size {
                    return r.malformed(format!(
                        "match of {} overruns the declared size {}",
                        length, size
                    ));
                }
                copy_match(&mut out, displacement, length)?;
            }
            mask >>= 1;
        }
        Ok(out)
    }

    #[allow(clippy::indexing_slicing)]
    pub(crate) fn encode(input: &[u8], out: &mut Vec<u8>) -> Res<()> {
        write_gba_header(out, TYPE_BYTE, input.len())?;
        let tokens = parse(input, &config(), &Prices)?;
        let mut mask = 0u8;
        let mut flag_at = 0usize;
        for token in &tokens {
            if mask == 0 {
                flag_at = out.len();
                out.push(0);
                mask = 0x80;
            }
            match token {
                Token::Literal { position } => out.push(input[*position]),
                Token::Match(m) => {
                    out[flag_at] |= mask;
                    let d = m.displacement - 1;
                    if m.length <= 0x10 {
                        out.push(((m.length - 1) as u8) << 4 | (d >> 8) as u8);
                        out.push(d as u8);
                    } else if m.length <= 0x110 {
                        let l = m.length - 0x11;
                        out.push((l >> 4) as u8);
                        out.push(((l & 0xF) as u8) << 4 | (d >> 8) as u8);
                        out.push(d as u8);
                    } else {
                        let l = m.length - 0x111;
                        out.push(0x10 | (l >> 12) as u8);
                        out.push((l >> 4) as u8);
                        out.push(((l & 0xF) as u8) << 4 | (d >> 8) as u8);
                        out.push(d as u8);
                    }
                }
            }
            mask >>= 1;
        }
        Ok(())
    }
}

/// LZ40 and LZ60 share one body; only the header type byte differs.
pub(crate) mod lz40 {
    use super::*;

    pub(crate) const TYPE_LZ40: u8 = 0x40;
    pub(crate) const TYPE_LZ60: u8 = 0x60;

    pub(crate) fn config() -> LzConfig {
        LzConfig::new(vec![FindLimitations::new(3, 0x1010F, 1, 0xFFF)], FindOptions::default())
    }

    pub(crate) struct Prices;

    impl PriceCalculator for Prices {
        fn literal_price(&self, _position: usize, _unit: &[u8]) -> u32 {
            9
        }
        fn match_price(&self, m: &Match) -> u32 {
            match m.length {
                ..=0xF => 17,
                ..=0x10F => 25,
                _ => 33,
            }
        }
    }

    pub(crate) fn decode(input: &[u8], type_byte: u8) -> Res<Vec<u8>> {
        let (size, body) = read_gba_header(input, type_byte)?;
        let mut r = ByteReader::new(body);
        let mut out = Vec::with_capacity(size);
        let mut mask = 0u8;
        let mut flags = 0u8;
        while out.len() < size {
            if mask == 0 {
                flags = r.u8()?;
                mask = 0x80;
            }
            if flags & mask == 0 {
                out.push(r.u8()?);
            } else {
                let v = r.u16_le()?;
                let displacement = usize::from(v & 0xFFF);
                let length = match v >> 12 {
                    0 => usize::from(r.u8()?) + 0x10,
                    1 => usize::from(r.u16_le()?) + 0x110,
                    n => usize::from(n),
                };
                if out.len() + length > size {
                    return r.malformed(format!(
                        "match of {} overruns the declared size {}",
                        length, size
                    ));
                }
                copy_match(&mut out, displacement, length)?;
            }
            mask >>= 1;
        }
        Ok(out)
    }

    #[allow(clippy::indexing_slicing)]
    pub(crate) fn encode(input: &[u8], out: &mut Vec<u8>, type_byte: u8) -> Res<()> {
        write_gba_header(out, type_byte, input.len())?;
        let tokens = parse(input, &config(), &Prices)?;
        let mut mask = 0u8;
        let mut flag_at = 0usize;
        for token in &tokens {
            if mask == 0 {
                flag_at = out.len();
                out.push(0);
                mask = 0x80;
            }
            match token {
                Token::Literal { position } => out.push(input[*position]),
                Token::Match(m) => {
                    out[flag_at] |= mask;
                    let d = m.displacement as u16;
                    if m.length <= 0xF {
                        out.extend_from_slice(&(d | (m.length as u16) << 12).to_le_bytes());
                    } else if m.length <= 0x10F {
                        out.extend_from_slice(&d.to_le_bytes());
                        out.push((m.length - 0x10) as u8);
                    } else {
                        out.extend_from_slice(&(d | 1 << 12).to_le_bytes());
                        out.extend_from_slice(&((m.length - 0x110) as u16).to_le_bytes());
                    }
                }
            }
            mask >>= 1;
        }
        Ok(())
    }
}
