//! Two LZSS renditions: the classic byte-flag layout behind an `SSZL`
//! header, and a variable-length-coded cousin with unbounded lengths and
//! displacements.

use crate::core::error::{CodecError, ErrorKind, Res};
use crate::core::parser::parse;
use crate::core::{FindLimitations, FindOptions, LzConfig, Match, PriceCalculator, Token};
use crate::format::{copy_match, ByteReader};

/// Classic LZSS: `SSZL` magic, u32 LE decompressed size, then flag bytes
/// consumed LSB-first. A set flag bit is a literal; a clear bit is a two-byte
/// reference `lo(disp-1)`, `hi(disp-1) << 4 | (len-3)`.
pub(crate) mod classic {
    use super::*;

    const MAGIC: &[u8; 4] = b"SSZL";

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

    #[allow(clippy::indexing_slicing)]
    pub(crate) fn decode(input: &[u8]) -> Res<Vec<u8>> {
        if input.get(..4) != Some(MAGIC.as_slice()) {
            return Err(CodecError::new(ErrorKind::MalformedToken, "missing SSZL magic".to_string()));
        }
        let mut r = ByteReader::new(&input[4..]);
        let size = r.u32_le()? as usize;
        let mut out = Vec::with_capacity(size);
        let mut mask = 0u8;
        let mut flags = 0u8;
        while out.len() < size {
            if mask == 0 {
                flags = r.u8()?;
                mask = 0x01;
            }
            if flags & mask != 0 {
                out.push(r.u8()?);
            } else {
                let b1 = r.u8()?;
                let b2 = r.u8()?;
                let displacement = (usize::from(b2 & 0xF0) << 4 | usize::from(b1)) + 1;
                let length = usize::from(b2 & 0x0F) + 3;
                if out.len() + length > size {
                    return Err(CodecError::new(
                        ErrorKind::MalformedToken,
                        format!("match of {} overruns the declared size {}", length, size),
                    ));
                }
                copy_match(&mut out, displacement, length)?;
            }
            mask <<= 1;
        }
        Ok(out)
    }

    #[allow(clippy::indexing_slicing)]
    pub(crate) fn encode(input: &[u8], out: &mut Vec<u8>) -> Res<()> {
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&(input.len() as u32).to_le_bytes());
        let tokens = parse(input, &config(), &Prices)?;
        let mut mask = 0u8;
        let mut flag_at = 0usize;
        for token in &tokens {
            if mask == 0 {
                flag_at = out.len();
                out.push(0);
                mask = 0x01;
            }
            match token {
                Token::Literal { position } => {
                    out[flag_at] |= mask;
                    out.push(input[*position]);
                }
                Token::Match(m) => {
                    let d = m.displacement - 1;
                    out.push(d as u8);
                    out.push(((d >> 4) & 0xF0) as u8 | (m.length - 3) as u8);
                }
            }
            mask <<= 1;
        }
        Ok(())
    }
}

/// Variable-length-coded LZSS: u32 LE decompressed size, then commands built
/// from VLC integers (seven payload bits per byte, low group first, high bit
/// set while more groups follow). A command with its low bit set is a
/// literal run of `v >> 1` bytes; clear means a reference with displacement
/// `v >> 1` followed by a VLC length. Lengths and displacements are
/// unbounded above — the engine-side representation of the open bound is
/// `FindLimitations::UNBOUNDED`.
pub(crate) mod vlc {
    use super::*;

    pub(crate) fn config() -> LzConfig {
        LzConfig::new(
            vec![FindLimitations::new(
                4,
                FindLimitations::UNBOUNDED,
                1,
                FindLimitations::UNBOUNDED,
            )],
            FindOptions::default(),
        )
    }

    fn vlc_len(mut v: usize) -> u32 {
        let mut bytes = 1;
        while v >= 0x80 {
            v >>= 7;
            bytes += 1;
        }
        bytes
    }

    fn put_vlc(out: &mut Vec<u8>, mut v: usize) {
        while v >= 0x80 {
            out.push(0x80 | (v & 0x7F) as u8);
            v >>= 7;
        }
        out.push(v as u8);
    }

    fn read_vlc(r: &mut ByteReader<'_>) -> Res<usize> {
        let mut v = 0usize;
        let mut shift = 0u32;
        loop {
            let b = r.u8()?;
            if shift >= usize::BITS {
                return Err(CodecError::new(ErrorKind::MalformedToken, "vlc integer overflows"));
            }
            v |= usize::from(b & 0x7F) << shift;
            if b & 0x80 == 0 {
                return Ok(v);
            }
            shift += 7;
        }
    }

    /// Bucketed prices: a token costs exactly its VLC bytes on the wire.
    pub(crate) struct Prices;

    impl PriceCalculator for Prices {
        fn literal_price(&self, _position: usize, _unit: &[u8]) -> u32 {
            // One byte plus the run command amortized over typical runs.
            9
        }
        fn match_price(&self, m: &Match) -> u32 {
            (vlc_len(m.displacement << 1) + vlc_len(m.length)) * 8
        }
    }

    pub(crate) fn decode(input: &[u8]) -> Res<Vec<u8>> {
        let mut r = ByteReader::new(input);
        let size = r.u32_le()? as usize;
        let mut out = Vec::with_capacity(size);
        while out.len() < size {
            let v = read_vlc(&mut r)?;
            if v & 1 == 1 {
                let run = v >> 1;
                if run == 0 || out.len() + run > size {
                    return Err(CodecError::new(
                        ErrorKind::MalformedToken,
                        format!("literal run of {} at {} in {}", run, out.len(), size),
                    ));
                }
                out.extend_from_slice(r.take(run)?);
            } else {
                let displacement = v >> 1;
                let length = read_vlc(&mut r)?;
                if length == 0 || out.len() + length > size {
                    return Err(CodecError::new(
                        ErrorKind::MalformedToken,
                        format!("match of {} at {} in {}", length, out.len(), size),
                    ));
                }
                copy_match(&mut out, displacement, length)?;
            }
        }
        Ok(out)
    }

    #[cfg(test)]
    mod vlc_tests {
        use super::*;

        #[test_log::test]
        fn vlc_integers_round_trip() {
            for v in [0usize, 1, 0x7F, 0x80, 0x3FFF, 0x4000, 0x12_3456] {
                let mut buf = Vec::new();
                put_vlc(&mut buf, v);
                assert_eq!(buf.len(), vlc_len(v) as usize);
                let mut r = ByteReader::new(&buf);
                assert_eq!(read_vlc(&mut r).unwrap(), v);
            }
        }
    }

    #[allow(clippy::indexing_slicing)]
    pub(crate) fn encode(input: &[u8], out: &mut Vec<u8>) -> Res<()> {
        out.extend_from_slice(&(input.len() as u32).to_le_bytes());
        let tokens = parse(input, &config(), &Prices)?;
        let mut i = 0;
        while i < tokens.len() {
            match tokens[i] {
                Token::Literal { position } => {
                    let start = position;
                    let mut run = 0;
                    while i < tokens.len() && matches!(tokens[i], Token::Literal { .. }) {
                        run += 1;
                        i += 1;
                    }
                    put_vlc(out, run << 1 | 1);
                    out.extend_from_slice(&input[start..start + run]);
                }
                Token::Match(m) => {
                    put_vlc(out, m.displacement << 1);
                    put_vlc(out, m.length);
                    i += 1;
                }
            }
        }
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
            b"s".to_vec(),
            b"szl szl szl szl".to_vec(),
            b"a longer body with repeats, repeats, repeats and tails".repeat(9),
            vec![0x11; 0x2000],
        ]
    }

    #[test_log::test]
    fn classic_round_trips() {
        for input in sample_inputs() {
            let packed = Format::Lzss.encode_from(&input).unwrap();
            assert_eq!(Format::Lzss.decode_from(&packed).unwrap(), input);
        }
    }

    #[test_log::test]
    fn vlc_round_trips() {
        for input in sample_inputs() {
            let packed = Format::LzssVlc.encode_from(&input).unwrap();
            assert_eq!(Format::LzssVlc.decode_from(&packed).unwrap(), input);
        }
    }

    #[test_log::test]
    fn vlc_collapses_a_long_run_into_one_match() {
        // 0x2000 identical bytes: one literal, then a single unbounded-length
        // match — nothing in the format caps it at 0x12 or 0x111.
        let input = vec![0x11u8; 0x2000];
        let packed = Format::LzssVlc.encode_from(&input).unwrap();
        assert!(packed.len() <= 12, "expected one literal and one match, got {} bytes", packed.len());
    }

    #[test_log::test]
    fn classic_rejects_missing_magic() {
        let err = Format::Lzss.decode_from(b"ZZZZ\0\0\0\0").unwrap_err();
        assert_eq!(err.kind, ErrorKind::MalformedToken);
    }
}
