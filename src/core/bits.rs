//! Bit-granular readers and writers over in-memory byte streams.
//!
//! The legacy formats disagree on almost every axis of bit packing: some
//! consume the high bit of each unit first (GBA flag bytes), some the low bit
//! (Okumura-style LZSS), units are 8 or 16 bits wide, and 16-bit units may be
//! stored little- or big-endian. Both ends of a `(bit_order, byte_order,
//! unit_width)` configuration are provided here so a decoder and its encoder
//! can share one description of the stream.
//!
//! With [`BitOrder::MsbFirst`], `read_bits(n)` returns the first consumed bit
//! as the most significant bit of the result; with [`BitOrder::LsbFirst`] the
//! first consumed bit is the least significant. Writers mirror that exactly,
//! so a write plan read back under the same configuration reproduces the plan.

use crate::core::error::{CodecError, Res};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitOrder {
    MsbFirst,
    LsbFirst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Le,
    Be,
}

/// Width of the refill unit in bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitWidth {
    Bits8,
    Bits16,
}

impl UnitWidth {
    fn bits(self) -> u32 {
        match self {
            UnitWidth::Bits8 => 8,
            UnitWidth::Bits16 => 16,
        }
    }
}

pub struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
    bit_order: BitOrder,
    byte_order: ByteOrder,
    unit: UnitWidth,
    /// Remaining bits of the current unit, right-aligned.
    buf: u32,
    avail: u32,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8], bit_order: BitOrder, byte_order: ByteOrder, unit: UnitWidth) -> Self {
        BitReader { data, pos: 0, bit_order, byte_order, unit, buf: 0, avail: 0 }
    }

    /// Byte offset of the next unit fetch.
    pub fn byte_position(&self) -> usize {
        self.pos
    }

    /// Bits left in the partially consumed unit.
    pub fn pending_bits(&self) -> u32 {
        self.avail
    }

    #[allow(clippy::indexing_slicing)]
    fn refill(&mut self) -> Res<()> {
        let width = self.unit.bits() as usize / 8;
        let Some(bytes) = self.data.get(self.pos..self.pos + width) else {
            return Err(CodecError::truncated("bit stream unit"));
        };
        self.pos += width;
        self.buf = match (self.unit, self.byte_order) {
            (UnitWidth::Bits8, _) => u32::from(bytes[0]),
            (UnitWidth::Bits16, ByteOrder::Le) => u32::from(u16::from_le_bytes([bytes[0], bytes[1]])),
            (UnitWidth::Bits16, ByteOrder::Be) => u32::from(u16::from_be_bytes([bytes[0], bytes[1]])),
        };
        self.avail = self.unit.bits();
        Ok(())
    }

    pub fn read_bit(&mut self) -> Res<bool> {
        if self.avail == 0 {
            self.refill()?;
        }
        let bit = match self.bit_order {
            BitOrder::MsbFirst => (self.buf >> (self.avail - 1)) & 1,
            BitOrder::LsbFirst => {
                let b = self.buf & 1;
                self.buf >>= 1;
                b
            }
        };
        self.avail -= 1;
        Ok(bit != 0)
    }

    /// Read `n <= 32` bits as an unsigned integer.
    pub fn read_bits(&mut self, n: u32) -> Res<u32> {
        debug_assert!(n <= 32);
        let mut value = 0u32;
        for i in 0..n {
            let bit = u32::from(self.read_bit()?);
            match self.bit_order {
                BitOrder::MsbFirst => value = (value << 1) | bit,
                BitOrder::LsbFirst => value |= bit << i,
            }
        }
        Ok(value)
    }

    /// Drop the rest of the current unit so the next read starts on a unit
    /// boundary.
    pub fn align_to_unit(&mut self) {
        self.buf = 0;
        self.avail = 0;
    }
}

pub struct BitWriter {
    out: Vec<u8>,
    bit_order: BitOrder,
    byte_order: ByteOrder,
    unit: UnitWidth,
    buf: u32,
    filled: u32,
}

impl BitWriter {
    pub fn new(bit_order: BitOrder, byte_order: ByteOrder, unit: UnitWidth) -> Self {
        BitWriter { out: Vec::new(), bit_order, byte_order, unit, buf: 0, filled: 0 }
    }

    pub fn write_bit(&mut self, bit: bool) {
        let bit = u32::from(bit);
        match self.bit_order {
            BitOrder::MsbFirst => self.buf = (self.buf << 1) | bit,
            BitOrder::LsbFirst => self.buf |= bit << self.filled,
        }
        self.filled += 1;
        if self.filled == self.unit.bits() {
            self.flush_unit();
        }
    }

    /// Write the low `n` bits of `value`, in the configured bit order.
    pub fn write_bits(&mut self, value: u32, n: u32) {
        debug_assert!(n <= 32);
        for i in 0..n {
            let bit = match self.bit_order {
                BitOrder::MsbFirst => (value >> (n - 1 - i)) & 1,
                BitOrder::LsbFirst => (value >> i) & 1,
            };
            self.write_bit(bit != 0);
        }
    }

    fn flush_unit(&mut self) {
        let unit = self.buf;
        match (self.unit, self.byte_order) {
            (UnitWidth::Bits8, _) => self.out.push(unit as u8),
            (UnitWidth::Bits16, ByteOrder::Le) => self.out.extend_from_slice(&(unit as u16).to_le_bytes()),
            (UnitWidth::Bits16, ByteOrder::Be) => self.out.extend_from_slice(&(unit as u16).to_be_bytes()),
        }
        self.buf = 0;
        self.filled = 0;
    }

    /// Zero-pad the trailing partial unit and return the byte stream.
    pub fn finish(mut self) -> Vec<u8> {
        if self.filled > 0 {
            let missing = self.unit.bits() - self.filled;
            match self.bit_order {
                BitOrder::MsbFirst => self.buf <<= missing,
                BitOrder::LsbFirst => {}
            }
            self.filled = self.unit.bits();
            self.flush_unit();
        }
        self.out
    }

    pub fn bits_written(&self) -> usize {
        self.out.len() * 8 + self.filled as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIGS: [(BitOrder, ByteOrder, UnitWidth); 8] = [
        (BitOrder::MsbFirst, ByteOrder::Le, UnitWidth::Bits8),
        (BitOrder::MsbFirst, ByteOrder::Be, UnitWidth::Bits8),
        (BitOrder::MsbFirst, ByteOrder::Le, UnitWidth::Bits16),
        (BitOrder::MsbFirst, ByteOrder::Be, UnitWidth::Bits16),
        (BitOrder::LsbFirst, ByteOrder::Le, UnitWidth::Bits8),
        (BitOrder::LsbFirst, ByteOrder::Be, UnitWidth::Bits8),
        (BitOrder::LsbFirst, ByteOrder::Le, UnitWidth::Bits16),
        (BitOrder::LsbFirst, ByteOrder::Be, UnitWidth::Bits16),
    ];

    #[test_log::test]
    fn round_trip_every_configuration() {
        // A plan of (value, width) writes covering 1..=24 bit fields.
        let plan: Vec<(u32, u32)> = (1..=24)
            .map(|n| ((0xA5A5_5A5Au32 ^ (n * 0x0101_0101)) & ((1u32 << n) - 1), n))
            .collect();
        for (bit_order, byte_order, unit) in CONFIGS {
            let mut writer = BitWriter::new(bit_order, byte_order, unit);
            for &(value, n) in &plan {
                writer.write_bits(value, n);
            }
            let bytes = writer.finish();
            let mut reader = BitReader::new(&bytes, bit_order, byte_order, unit);
            for &(value, n) in &plan {
                assert_eq!(reader.read_bits(n).unwrap(), value, "{:?}/{:?}/{:?}", bit_order, byte_order, unit);
            }
        }
    }

    #[test_log::test]
    fn msb_first_takes_the_high_bit() {
        let data = [0b1010_0000u8];
        let mut reader = BitReader::new(&data, BitOrder::MsbFirst, ByteOrder::Le, UnitWidth::Bits8);
        assert!(reader.read_bit().unwrap());
        assert!(!reader.read_bit().unwrap());
        assert!(reader.read_bit().unwrap());
    }

    #[test_log::test]
    fn lsb_first_takes_the_low_bit() {
        let data = [0b0000_0101u8];
        let mut reader = BitReader::new(&data, BitOrder::LsbFirst, ByteOrder::Le, UnitWidth::Bits8);
        assert!(reader.read_bit().unwrap());
        assert!(!reader.read_bit().unwrap());
        assert!(reader.read_bit().unwrap());
    }

    #[test_log::test]
    fn sixteen_bit_units_respect_byte_order() {
        // 0x0180 LE on disk is [0x80, 0x01]; MSB-first reads bit 15 first.
        let data = [0x80u8, 0x01];
        let mut le = BitReader::new(&data, BitOrder::MsbFirst, ByteOrder::Le, UnitWidth::Bits16);
        assert_eq!(le.read_bits(16).unwrap(), 0x0180);
        let mut be = BitReader::new(&data, BitOrder::MsbFirst, ByteOrder::Be, UnitWidth::Bits16);
        assert_eq!(be.read_bits(16).unwrap(), 0x8001);
    }

    #[test_log::test]
    fn draining_past_the_end_is_truncated_input() {
        let data = [0xFFu8];
        let mut reader = BitReader::new(&data, BitOrder::MsbFirst, ByteOrder::Le, UnitWidth::Bits8);
        assert_eq!(reader.read_bits(8).unwrap(), 0xFF);
        let err = reader.read_bit().unwrap_err();
        assert_eq!(err.kind, crate::core::error::ErrorKind::TruncatedInput);
    }

    #[test_log::test]
    fn finish_pads_with_zeros_to_a_unit_boundary() {
        let mut writer = BitWriter::new(BitOrder::MsbFirst, ByteOrder::Le, UnitWidth::Bits8);
        writer.write_bits(0b101, 3);
        assert_eq!(writer.finish(), vec![0b1010_0000]);

        let mut writer = BitWriter::new(BitOrder::LsbFirst, ByteOrder::Le, UnitWidth::Bits16);
        writer.write_bits(0b101, 3);
        assert_eq!(writer.finish(), vec![0b0000_0101, 0x00]);
    }
}
