//! The N64-era mask-bit family: YAZ0 (interleaved), and the sectioned YAY0
//! and MIO0 layouts that split mask bits, link words and literal chunks into
//! separate regions. Each exists in little- and big-endian flavors; the
//! endianness applies to every numeric field (sizes, section offsets, mask
//! words, link words) while magic bytes and literals stay as-is.

use crate::core::error::{CodecError, ErrorKind, Res};
use crate::core::parser::parse;
use crate::core::{FindLimitations, FindOptions, LzConfig, Match, PriceCalculator, Token};
use crate::format::{copy_match, ByteReader};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Endian {
    Le,
    Be,
}

impl Endian {
    fn u16(self, bytes: [u8; 2]) -> u16 {
        match self {
            Endian::Le => u16::from_le_bytes(bytes),
            Endian::Be => u16::from_be_bytes(bytes),
        }
    }

    fn u32(self, bytes: [u8; 4]) -> u32 {
        match self {
            Endian::Le => u32::from_le_bytes(bytes),
            Endian::Be => u32::from_be_bytes(bytes),
        }
    }

    fn put_u16(self, out: &mut Vec<u8>, v: u16) {
        match self {
            Endian::Le => out.extend_from_slice(&v.to_le_bytes()),
            Endian::Be => out.extend_from_slice(&v.to_be_bytes()),
        }
    }

    fn put_u32(self, out: &mut Vec<u8>, v: u32) {
        match self {
            Endian::Le => out.extend_from_slice(&v.to_le_bytes()),
            Endian::Be => out.extend_from_slice(&v.to_be_bytes()),
        }
    }
}

fn read_u32_at(data: &[u8], at: usize, endian: Endian) -> Res<u32> {
    let bytes = data
        .get(at..at + 4)
        .ok_or_else(|| CodecError::truncated("u32 field"))?;
    Ok(endian.u32([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn read_u16_at(data: &[u8], at: usize, endian: Endian) -> Res<u16> {
    let bytes = data
        .get(at..at + 2)
        .ok_or_else(|| CodecError::truncated("u16 field"))?;
    Ok(endian.u16([bytes[0], bytes[1]]))
}

fn check_magic(input: &[u8], magic: &[u8; 4]) -> Res<()> {
    if input.get(..4) != Some(magic.as_slice()) {
        return Err(CodecError::new(
            ErrorKind::MalformedToken,
            format!("missing {:?} magic", String::from_utf8_lossy(magic)),
        ));
    }
    Ok(())
}

/// Accumulates the per-token mask bits into 32-bit words, high bit first.
struct MaskBits {
    words: Vec<u32>,
    current: u32,
    filled: u32,
}

impl MaskBits {
    fn new() -> Self {
        MaskBits { words: Vec::new(), current: 0, filled: 0 }
    }

    fn push(&mut self, literal: bool) {
        if literal {
            self.current |= 1 << (31 - self.filled);
        }
        self.filled += 1;
        if self.filled == 32 {
            self.words.push(self.current);
            self.current = 0;
            self.filled = 0;
        }
    }

    fn finish(mut self) -> Vec<u32> {
        if self.filled > 0 {
            self.words.push(self.current);
        }
        self.words
    }
}

pub(crate) mod yaz0 {
    use super::*;

    const MAGIC: &[u8; 4] = b"Yaz0";

    pub(crate) fn config() -> LzConfig {
        LzConfig::new(vec![FindLimitations::new(3, 0x111, 1, 0x1000)], FindOptions::default())
    }

    pub(crate) struct Prices;

    impl PriceCalculator for Prices {
        fn literal_price(&self, _position: usize, _unit: &[u8]) -> u32 {
            9
        }
        fn match_price(&self, m: &Match) -> u32 {
            if m.length <= 0x11 {
                17
            } else {
                25
            }
        }
    }

    pub(crate) fn decode(input: &[u8], endian: Endian) -> Res<Vec<u8>> {
        check_magic(input, MAGIC)?;
        let size = read_u32_at(input, 4, endian)? as usize;
        let mut r = ByteReader::new(input.get(16..).ok_or_else(|| CodecError::truncated("header"))?);
        let mut out = Vec::with_capacity(size);
        let mut mask = 0u8;
        let mut flags = 0u8;
        while out.len() < size {
            if mask == 0 {
                flags = r.u8()?;
                mask = 0x80;
            }
            if flags & mask != 0 {
                out.push(r.u8()?);
            } else {
                let v = endian.u16([r.u8()?, r.u8()?]);
                let displacement = usize::from(v & 0xFFF) + 1;
                let n = v >> 12;
                let length = if n == 0 { usize::from(r.u8()?) + 0x12 } else { usize::from(n) + 2 };
                if out.len() + length > size {
                    return Err(CodecError::new(
                        ErrorKind::MalformedToken,
                        format!("match of {} overruns the declared size {}", length, size),
                    ));
                }
                copy_match(&mut out, displacement, length)?;
            }
            mask >>= 1;
        }
        Ok(out)
    }

    #[allow(clippy::indexing_slicing)]
    pub(crate) fn encode(input: &[u8], out: &mut Vec<u8>, endian: Endian) -> Res<()> {
        out.extend_from_slice(MAGIC);
        endian.put_u32(out, input.len() as u32);
        out.extend_from_slice(&[0u8; 8]);
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
                Token::Literal { position } => {
                    out[flag_at] |= mask;
                    out.push(input[*position]);
                }
                Token::Match(m) => {
                    let d = (m.displacement - 1) as u16;
                    if m.length <= 0x11 {
                        endian.put_u16(out, ((m.length - 2) as u16) << 12 | d);
                    } else {
                        endian.put_u16(out, d);
                        out.push((m.length - 0x12) as u8);
                    }
                }
            }
            mask >>= 1;
        }
        Ok(())
    }
}

/// The sectioned layouts differ from YAZ0 only in where bytes live, so YAY0
/// and MIO0 share a section-cursor decoder parameterized on the link escape.
struct Sections<'a> {
    data: &'a [u8],
    endian: Endian,
    mask_at: usize,
    link_at: usize,
    chunk_at: usize,
}

impl Sections<'_> {
    fn mask_word(&mut self) -> Res<u32> {
        let w = read_u32_at(self.data, self.mask_at, self.endian)?;
        self.mask_at += 4;
        Ok(w)
    }

    fn link_word(&mut self) -> Res<u16> {
        let w = read_u16_at(self.data, self.link_at, self.endian)?;
        self.link_at += 2;
        Ok(w)
    }

    fn chunk_byte(&mut self) -> Res<u8> {
        let b = *self
            .data
            .get(self.chunk_at)
            .ok_or_else(|| CodecError::truncated("chunk byte"))?;
        self.chunk_at += 1;
        Ok(b)
    }
}

fn decode_sectioned(input: &[u8], endian: Endian, magic: &[u8; 4], long_escape: bool) -> Res<Vec<u8>> {
    check_magic(input, magic)?;
    let size = read_u32_at(input, 4, endian)? as usize;
    let link_at = read_u32_at(input, 8, endian)? as usize;
    let chunk_at = read_u32_at(input, 12, endian)? as usize;
    let mut sections = Sections { data: input, endian, mask_at: 16, link_at, chunk_at };
    let mut out = Vec::with_capacity(size);
    let mut word = 0u32;
    let mut bits_left = 0u32;
    while out.len() < size {
        if bits_left == 0 {
            word = sections.mask_word()?;
            bits_left = 32;
        }
        let literal = word & 0x8000_0000 != 0;
        word <<= 1;
        bits_left -= 1;
        if literal {
            let b = sections.chunk_byte()?;
            out.push(b);
        } else {
            let v = sections.link_word()?;
            let displacement = usize::from(v & 0xFFF) + 1;
            let n = v >> 12;
            let length = if long_escape && n == 0 {
                usize::from(sections.chunk_byte()?) + 0x12
            } else if long_escape {
                usize::from(n) + 2
            } else {
                usize::from(n) + 3
            };
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
fn encode_sectioned(
    input: &[u8],
    out: &mut Vec<u8>,
    endian: Endian,
    magic: &[u8; 4],
    long_escape: bool,
    config: &LzConfig,
    prices: &dyn PriceCalculator,
) -> Res<()> {
    let tokens = parse(input, config, prices)?;
    let mut masks = MaskBits::new();
    let mut links = Vec::new();
    let mut chunks = Vec::new();
    for token in &tokens {
        match token {
            Token::Literal { position } => {
                masks.push(true);
                chunks.push(input[*position]);
            }
            Token::Match(m) => {
                masks.push(false);
                let d = (m.displacement - 1) as u16;
                if long_escape {
                    if m.length <= 0x11 {
                        endian.put_u16(&mut links, ((m.length - 2) as u16) << 12 | d);
                    } else {
                        endian.put_u16(&mut links, d);
                        chunks.push((m.length - 0x12) as u8);
                    }
                } else {
                    endian.put_u16(&mut links, ((m.length - 3) as u16) << 12 | d);
                }
            }
        }
    }
    let mask_words = masks.finish();
    let link_at = 16 + mask_words.len() * 4;
    let chunk_at = link_at + links.len();
    out.extend_from_slice(magic);
    endian.put_u32(out, input.len() as u32);
    endian.put_u32(out, link_at as u32);
    endian.put_u32(out, chunk_at as u32);
    for w in mask_words {
        endian.put_u32(out, w);
    }
    out.extend_from_slice(&links);
    out.extend_from_slice(&chunks);
    Ok(())
}

pub(crate) mod yay0 {
    use super::*;

    const MAGIC: &[u8; 4] = b"Yay0";

    pub(crate) fn decode(input: &[u8], endian: Endian) -> Res<Vec<u8>> {
        decode_sectioned(input, endian, MAGIC, true)
    }

    pub(crate) fn encode(input: &[u8], out: &mut Vec<u8>, endian: Endian) -> Res<()> {
        encode_sectioned(input, out, endian, MAGIC, true, &yaz0::config(), &yaz0::Prices)
    }
}

pub(crate) mod mio0 {
    use super::*;

    const MAGIC: &[u8; 4] = b"MIO0";

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

    pub(crate) fn decode(input: &[u8], endian: Endian) -> Res<Vec<u8>> {
        decode_sectioned(input, endian, MAGIC, false)
    }

    pub(crate) fn encode(input: &[u8], out: &mut Vec<u8>, endian: Endian) -> Res<()> {
        encode_sectioned(input, out, endian, MAGIC, false, &config(), &Prices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::Format;

    fn sample_inputs() -> Vec<Vec<u8>> {
        vec![
            Vec::new(),
            b"Y".to_vec(),
            b"yazyazyazyazyaz".to_vec(),
            b"The MIO0 format ships on the Nintendo 64.".repeat(12),
            vec![0u8; 0x800],
            (0u8..=255).cycle().take(1000).collect(),
        ]
    }

    #[test_log::test]
    fn yaz0_round_trips_both_endians() {
        for format in [Format::Yaz0Le, Format::Yaz0Be] {
            for input in sample_inputs() {
                let packed = format.encode_from(&input).unwrap();
                assert_eq!(format.decode_from(&packed).unwrap(), input, "{:?}", format);
            }
        }
    }

    #[test_log::test]
    fn yay0_round_trips_both_endians() {
        for format in [Format::Yay0Le, Format::Yay0Be] {
            for input in sample_inputs() {
                let packed = format.encode_from(&input).unwrap();
                assert_eq!(format.decode_from(&packed).unwrap(), input, "{:?}", format);
            }
        }
    }

    #[test_log::test]
    fn mio0_round_trips_both_endians() {
        for format in [Format::Mio0Le, Format::Mio0Be] {
            for input in sample_inputs() {
                let packed = format.encode_from(&input).unwrap();
                assert_eq!(format.decode_from(&packed).unwrap(), input, "{:?}", format);
            }
        }
    }

    #[test_log::test]
    fn yaz0_long_runs_use_the_three_byte_form() {
        let input = vec![9u8; 0x300];
        let packed = Format::Yaz0Be.encode_from(&input).unwrap();
        assert!(packed.len() < 0x30);
        assert_eq!(Format::Yaz0Be.decode_from(&packed).unwrap(), input);
    }

    #[test_log::test]
    fn sectioned_headers_point_inside_the_stream() {
        let input = b"link and chunk sections".repeat(4);
        let packed = Format::Mio0Be.encode_from(&input).unwrap();
        let link_at = u32::from_be_bytes([packed[8], packed[9], packed[10], packed[11]]) as usize;
        let chunk_at = u32::from_be_bytes([packed[12], packed[13], packed[14], packed[15]]) as usize;
        assert!(16 <= link_at && link_at <= chunk_at && chunk_at <= packed.len());
    }

    #[test_log::test]
    fn wrong_magic_is_malformed() {
        let err = Format::Yaz0Be.decode_from(b"Yay0\0\0\0\0").unwrap_err();
        assert_eq!(err.kind, ErrorKind::MalformedToken);
    }
}
