//! LzEnc: a byte-oriented LZ with open-ended match lengths. Decode-only —
//! the facade answers `UnsupportedOperation` for encode requests.
//!
//! After a u32 LE decompressed size, each command byte `c` is either a
//! literal run (`c & 0x80` clear: `c + 1` verbatim bytes) or a reference:
//! the displacement is `((c & 0x7F) << 6 | b2 >> 2) + 1` and the two low
//! bits of `b2` select the length — values 0..=2 mean `3..=5`, value 3
//! starts a byte chain at 6 where each 0xFF continues into the next byte.

use crate::core::error::{ErrorContext, Res};
use crate::format::{copy_match, ByteReader};

pub(crate) fn decode(input: &[u8]) -> Res<Vec<u8>> {
    let mut r = ByteReader::new(input);
    let size = r.u32_le()? as usize;
    let mut out = Vec::with_capacity(size);
    while out.len() < size {
        let c = r.u8()?;
        if c & 0x80 == 0 {
            let run = usize::from(c) + 1;
            if out.len() + run > size {
                return r.malformed(format!("literal run of {} overruns the declared size {}", run, size));
            }
            out.extend_from_slice(r.take(run)?);
        } else {
            let b2 = r.u8()?;
            let displacement = (usize::from(c & 0x7F) << 6 | usize::from(b2 >> 2)) + 1;
            let length = match b2 & 3 {
                short @ 0..=2 => usize::from(short) + 3,
                _ => {
                    let mut length = 6usize;
                    loop {
                        let ext = r.u8()?;
                        length += usize::from(ext);
                        if ext != 0xFF {
                            break;
                        }
                    }
                    length
                }
            };
            if out.len() + length > size {
                return r.malformed(format!("match of {} overruns the declared size {}", length, size));
            }
            copy_match(&mut out, displacement, length)?;
        }
    }
    Ok(out)
}
