//! The Tales-series archive compression, modes 0x01 and 0x03. Decode-only:
//! the corresponding encoders have never been needed, and the facade reports
//! `UnsupportedOperation` for them.
//!
//! Header: mode byte, u32 LE compressed body size, u32 LE decompressed
//! size. The body is an Okumura LZSS stream over a 0x1000-byte zero-filled
//! ring: LSB-first flag bytes, a set bit for a literal, a clear bit for
//! `lo(offset)`, `hi4(offset) << 4 | (len - 3)` with `offset` an absolute
//! ring position. Mode 0x01 starts its ring cursor at 0xFEE, mode 0x03 at
//! 0xFEF.

use crate::core::error::{ErrorContext, Res};
use crate::format::ByteReader;

const WINDOW: usize = 0x1000;

pub(crate) const MODE_01: u8 = 0x01;
pub(crate) const MODE_03: u8 = 0x03;

fn ring_start(mode: u8) -> usize {
    match mode {
        MODE_01 => 0xFEE,
        _ => 0xFEF,
    }
}

#[allow(clippy::indexing_slicing)]
pub(crate) fn decode(input: &[u8], mode: u8) -> Res<Vec<u8>> {
    let mut r = ByteReader::new(input);
    let found_mode = r.u8()?;
    if found_mode != mode {
        return r.malformed(format!("expected mode {:#04x}, found {:#04x}", mode, found_mode));
    }
    let body_size = r.u32_le()? as usize;
    let size = r.u32_le()? as usize;
    let body = r.take(body_size)?;
    let mut r = ByteReader::new(body);

    let mut ring = [0u8; WINDOW];
    let mut ring_at = ring_start(mode);
    let mut out = Vec::with_capacity(size);
    let mut mask = 0u8;
    let mut flags = 0u8;
    while out.len() < size {
        if mask == 0 {
            flags = r.u8()?;
            mask = 0x01;
        }
        if flags & mask != 0 {
            let b = r.u8()?;
            ring[ring_at] = b;
            ring_at = (ring_at + 1) % WINDOW;
            out.push(b);
        } else {
            let b1 = r.u8()?;
            let b2 = r.u8()?;
            let offset = usize::from(b2 & 0xF0) << 4 | usize::from(b1);
            let length = usize::from(b2 & 0x0F) + 3;
            if out.len() + length > size {
                return r.malformed(format!("match of {} overruns the declared size {}", length, size));
            }
            for i in 0..length {
                let b = ring[(offset + i) % WINDOW];
                ring[ring_at] = b;
                ring_at = (ring_at + 1) % WINDOW;
                out.push(b);
            }
        }
        mask <<= 1;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;
    use crate::format::Format;

    /// Hand-assembled reference streams stand in for the golden corpus.
    fn pack(mode: u8, size: usize, body: &[u8]) -> Vec<u8> {
        let mut v = vec![mode];
        v.extend_from_slice(&(body.len() as u32).to_le_bytes());
        v.extend_from_slice(&(size as u32).to_le_bytes());
        v.extend_from_slice(body);
        v
    }

    #[test_log::test]
    fn literals_pass_through() {
        let body = [0b0001_1111u8, b'h', b'e', b'l', b'l', b'o'];
        let packed = pack(MODE_01, 5, &body);
        assert_eq!(Format::TalesOf01.decode_from(&packed).unwrap(), b"hello");
    }

    #[test_log::test]
    fn references_copy_from_the_ring() {
        // Three literals "aba", then a reference to ring offset 0xFEE
        // (where the first 'a' landed) of length 5, overlapping itself.
        let body = [0b0000_0111u8, b'a', b'b', b'a', 0xEE, 0xF2];
        let packed = pack(MODE_01, 8, &body);
        assert_eq!(Format::TalesOf01.decode_from(&packed).unwrap(), b"abaabaab");
    }

    #[test_log::test]
    fn untouched_ring_space_reads_as_zeros() {
        // Mode 3: a reference into the pristine window yields zeros.
        let body = [0b0000_0010u8, 0x00, 0x01, b'Z'];
        let packed = pack(MODE_03, 5, &body);
        assert_eq!(Format::TalesOf03.decode_from(&packed).unwrap(), &[0, 0, 0, 0, b'Z']);
    }

    #[test_log::test]
    fn mode_bytes_are_checked() {
        let packed = pack(MODE_03, 0, &[]);
        let err = Format::TalesOf01.decode_from(&packed).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MalformedToken);
    }
}
