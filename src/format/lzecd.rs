//! LzEcd: an Okumura-style ring-buffer LZSS whose 0x400-byte window starts
//! at position 0x3BE, zero-filled — so the first bytes of a stream can
//! already reference 0x3BE bytes of virtual zeros. The engine sees that
//! window as a pre-buffer.
//!
//! Layout: u32 LE decompressed size, then LSB-first flag bytes. A set bit is
//! a literal; a clear bit is `lo(offset)`, `hi2(offset) << 6 | (len - 3)`
//! where `offset` is the absolute ring position of the copy source.

use crate::core::error::{CodecError, ErrorKind, Res};
use crate::core::parser::parse;
use crate::core::{FindLimitations, FindOptions, LzConfig, Match, PriceCalculator, Token};
use crate::format::ByteReader;

const WINDOW: usize = 0x400;
const START: usize = 0x3BE;

pub(crate) fn config() -> LzConfig {
    LzConfig::new(
        vec![FindLimitations::new(3, 0x42, 1, WINDOW)],
        FindOptions { pre_buffer: vec![0u8; START], ..Default::default() },
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
    let mut r = ByteReader::new(input);
    let size = r.u32_le()? as usize;
    let mut ring = [0u8; WINDOW];
    let mut ring_at = START;
    let mut out = Vec::with_capacity(size);
    let push = |ring: &mut [u8; WINDOW], ring_at: &mut usize, out: &mut Vec<u8>, b: u8| {
        ring[*ring_at] = b;
        *ring_at = (*ring_at + 1) % WINDOW;
        out.push(b);
    };
    let mut mask = 0u8;
    let mut flags = 0u8;
    while out.len() < size {
        if mask == 0 {
            flags = r.u8()?;
            mask = 0x01;
        }
        if flags & mask != 0 {
            let b = r.u8()?;
            push(&mut ring, &mut ring_at, &mut out, b);
        } else {
            let b1 = r.u8()?;
            let b2 = r.u8()?;
            let offset = usize::from(b2 >> 6) << 8 | usize::from(b1);
            let length = usize::from(b2 & 0x3F) + 3;
            if out.len() + length > size {
                return Err(CodecError::new(
                    ErrorKind::MalformedToken,
                    format!("match of {} overruns the declared size {}", length, size),
                ));
            }
            for i in 0..length {
                let b = ring[(offset + i) % WINDOW];
                push(&mut ring, &mut ring_at, &mut out, b);
            }
        }
        mask <<= 1;
    }
    Ok(out)
}

#[allow(clippy::indexing_slicing)]
pub(crate) fn encode(input: &[u8], out: &mut Vec<u8>) -> Res<()> {
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
                // The ring cursor tracks output position; rebase the
                // displacement to an absolute ring offset.
                let cursor = (START + m.position) % WINDOW;
                let offset = (cursor + WINDOW - m.displacement % WINDOW) % WINDOW;
                out.push(offset as u8);
                out.push(((offset >> 8) as u8) << 6 | (m.length - 3) as u8);
            }
        }
        mask >>= 1;
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
            b"e".to_vec(),
            b"ecd ecd ecd ecd ecd".to_vec(),
            b"window wrap check ".repeat(0x60),
            vec![0u8; 0x500],
        ];
        for input in inputs {
            let packed = Format::LzEcd.encode_from(&input).unwrap();
            assert_eq!(Format::LzEcd.decode_from(&packed).unwrap(), input, "len {}", input.len());
        }
    }

    #[test_log::test]
    fn zero_input_leans_on_the_zero_filled_window() {
        // Every byte of an all-zero input can be served from the virtual
        // window, so the stream is matches only: no literal flags at all.
        let input = vec![0u8; 0x500];
        let packed = Format::LzEcd.encode_from(&input).unwrap();
        let max_match = 0x42;
        let token_count = input.len().div_ceil(max_match);
        let expected = 4 + token_count.div_ceil(8) + token_count * 2;
        assert_eq!(packed.len(), expected);
    }

    #[test_log::test]
    fn decodes_a_reference_into_untouched_window_space() {
        // Match at ring offset 0x200 before anything was written there:
        // yields zeros from the pristine window.
        let packed = [5u8, 0, 0, 0, 0b0000_0010, 0x00, 0b1000_0001, b'!'];
        assert_eq!(decode(&packed).unwrap(), &[0, 0, 0, 0, b'!']);
    }
}
