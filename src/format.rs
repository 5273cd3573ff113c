//! Per-format codec adapters and the [`Format`] dispatch facade.
//!
//! Adapters own their wire layout — headers, flag packing, token bit fields —
//! and nothing else. All of them drive the shared engine in `core` for match
//! finding, parsing and pricing, so an adapter is mostly a description of its
//! format plus two serialization loops.

mod huffman;
mod lz77;
mod lze;
mod lzecd;
mod lzenc;
mod lzss;
mod n64;
mod nintendo;
mod rle;
mod taiko;
mod tales;
mod wp16;

use std::io::{Read, Write};

use crate::core::error::{CodecError, ErrorContext, ErrorKind, Res, WithContext};

/// Every codec the crate speaks. The `Le`/`Be` pairs are byte-order variants
/// of the same token layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Lz10,
    Lz11,
    Lz40,
    Lz60,
    NintendoRle,
    Huffman4Le,
    Huffman4Be,
    Huffman8Le,
    Huffman8Be,
    Mio0Le,
    Mio0Be,
    Yay0Le,
    Yay0Be,
    Yaz0Le,
    Yaz0Be,
    Lzss,
    LzssVlc,
    Lz77,
    BackwardLz77,
    LzEcd,
    Lze,
    LzEnc,
    TaikoLz80,
    TaikoLz81,
    Wp16,
    TalesOf01,
    TalesOf03,
}

impl Format {
    pub const ALL: [Format; 27] = [
        Format::Lz10,
        Format::Lz11,
        Format::Lz40,
        Format::Lz60,
        Format::NintendoRle,
        Format::Huffman4Le,
        Format::Huffman4Be,
        Format::Huffman8Le,
        Format::Huffman8Be,
        Format::Mio0Le,
        Format::Mio0Be,
        Format::Yay0Le,
        Format::Yay0Be,
        Format::Yaz0Le,
        Format::Yaz0Be,
        Format::Lzss,
        Format::LzssVlc,
        Format::Lz77,
        Format::BackwardLz77,
        Format::LzEcd,
        Format::Lze,
        Format::LzEnc,
        Format::TaikoLz80,
        Format::TaikoLz81,
        Format::Wp16,
        Format::TalesOf01,
        Format::TalesOf03,
    ];

    /// TalesOf01/03 and LzEnc ship without encoders; everything else round
    /// trips.
    pub fn supports_encoding(&self) -> bool {
        !matches!(self, Format::TalesOf01 | Format::TalesOf03 | Format::LzEnc)
    }

    /// Decompress a complete compressed stream.
    pub fn decode_from(&self, input: &[u8]) -> Res<Vec<u8>> {
        log::debug!("{:?}: decoding {} compressed bytes", self, input.len());
        match self {
            Format::Lz10 => nintendo::lz10::decode(input),
            Format::Lz11 => nintendo::lz11::decode(input),
            Format::Lz40 => nintendo::lz40::decode(input, nintendo::lz40::TYPE_LZ40),
            Format::Lz60 => nintendo::lz40::decode(input, nintendo::lz40::TYPE_LZ60),
            Format::NintendoRle => rle::decode(input),
            Format::Huffman4Le => huffman::decode(input, huffman::Width::Nibble, huffman::Order::Le),
            Format::Huffman4Be => huffman::decode(input, huffman::Width::Nibble, huffman::Order::Be),
            Format::Huffman8Le => huffman::decode(input, huffman::Width::Byte, huffman::Order::Le),
            Format::Huffman8Be => huffman::decode(input, huffman::Width::Byte, huffman::Order::Be),
            Format::Mio0Le => n64::mio0::decode(input, n64::Endian::Le),
            Format::Mio0Be => n64::mio0::decode(input, n64::Endian::Be),
            Format::Yay0Le => n64::yay0::decode(input, n64::Endian::Le),
            Format::Yay0Be => n64::yay0::decode(input, n64::Endian::Be),
            Format::Yaz0Le => n64::yaz0::decode(input, n64::Endian::Le),
            Format::Yaz0Be => n64::yaz0::decode(input, n64::Endian::Be),
            Format::Lzss => lzss::classic::decode(input),
            Format::LzssVlc => lzss::vlc::decode(input),
            Format::Lz77 => lz77::forward::decode(input),
            Format::BackwardLz77 => lz77::backward::decode(input),
            Format::LzEcd => lzecd::decode(input),
            Format::Lze => lze::decode(input),
            Format::LzEnc => lzenc::decode(input),
            Format::TaikoLz80 => taiko::lz80::decode(input),
            Format::TaikoLz81 => taiko::lz81::decode(input),
            Format::Wp16 => wp16::decode(input),
            Format::TalesOf01 => tales::decode(input, tales::MODE_01),
            Format::TalesOf03 => tales::decode(input, tales::MODE_03),
        }
    }

    /// Compress `input` into a fresh buffer. Decode-only formats fail with
    /// `UnsupportedOperation` before touching any I/O.
    pub fn encode_from(&self, input: &[u8]) -> Res<Vec<u8>> {
        if !self.supports_encoding() {
            return self.raise(ErrorKind::UnsupportedOperation, "no encoder for this format".into());
        }
        log::debug!("{:?}: encoding {} raw bytes", self, input.len());
        let mut out = Vec::new();
        match self {
            Format::Lz10 => nintendo::lz10::encode(input, &mut out)?,
            Format::Lz11 => nintendo::lz11::encode(input, &mut out)?,
            Format::Lz40 => nintendo::lz40::encode(input, &mut out, nintendo::lz40::TYPE_LZ40)?,
            Format::Lz60 => nintendo::lz40::encode(input, &mut out, nintendo::lz40::TYPE_LZ60)?,
            Format::NintendoRle => rle::encode(input, &mut out)?,
            Format::Huffman4Le => huffman::encode(input, &mut out, huffman::Width::Nibble, huffman::Order::Le)?,
            Format::Huffman4Be => huffman::encode(input, &mut out, huffman::Width::Nibble, huffman::Order::Be)?,
            Format::Huffman8Le => huffman::encode(input, &mut out, huffman::Width::Byte, huffman::Order::Le)?,
            Format::Huffman8Be => huffman::encode(input, &mut out, huffman::Width::Byte, huffman::Order::Be)?,
            Format::Mio0Le => n64::mio0::encode(input, &mut out, n64::Endian::Le)?,
            Format::Mio0Be => n64::mio0::encode(input, &mut out, n64::Endian::Be)?,
            Format::Yay0Le => n64::yay0::encode(input, &mut out, n64::Endian::Le)?,
            Format::Yay0Be => n64::yay0::encode(input, &mut out, n64::Endian::Be)?,
            Format::Yaz0Le => n64::yaz0::encode(input, &mut out, n64::Endian::Le)?,
            Format::Yaz0Be => n64::yaz0::encode(input, &mut out, n64::Endian::Be)?,
            Format::Lzss => lzss::classic::encode(input, &mut out)?,
            Format::LzssVlc => lzss::vlc::encode(input, &mut out)?,
            Format::Lz77 => lz77::forward::encode(input, &mut out)?,
            Format::BackwardLz77 => lz77::backward::encode(input, &mut out)?,
            Format::LzEcd => lzecd::encode(input, &mut out)?,
            Format::Lze => lze::encode(input, &mut out)?,
            Format::TaikoLz80 => taiko::lz80::encode(input, &mut out)?,
            Format::TaikoLz81 => taiko::lz81::encode(input, &mut out)?,
            Format::Wp16 => wp16::encode(input, &mut out)?,
            Format::LzEnc | Format::TalesOf01 | Format::TalesOf03 => unreachable!("rejected above"),
        }
        Ok(out)
    }

    /// Reader/writer convenience over [`Format::decode_from`]. Returns the
    /// number of decompressed bytes written.
    pub fn decode(&self, reader: &mut dyn Read, writer: &mut dyn Write) -> Res<u64> {
        let mut input = Vec::new();
        reader.read_to_end(&mut input).map_err(CodecError::from).at(self)?;
        let out = self.decode_from(&input).at(self)?;
        writer.write_all(&out).map_err(CodecError::from).at(self)?;
        Ok(out.len() as u64)
    }

    /// Reader/writer convenience over [`Format::encode_from`]. Returns the
    /// number of compressed bytes written.
    pub fn encode(&self, input: &[u8], writer: &mut dyn Write) -> Res<u64> {
        let out = self.encode_from(input).at(self)?;
        writer.write_all(&out).map_err(CodecError::from).at(self)?;
        Ok(out.len() as u64)
    }
}

impl ErrorContext for Format {
    fn describe(&self) -> Option<String> {
        Some(format!("{:?} codec", self))
    }
}

/// GBA/DS style header: one type byte, then the decompressed size as u24 LE.
#[allow(clippy::indexing_slicing)]
pub(crate) fn read_gba_header(input: &[u8], type_byte: u8) -> Res<(usize, &[u8])> {
    let Some((&magic, rest)) = input.split_first() else {
        return Err(CodecError::truncated("header type byte"));
    };
    if magic != type_byte {
        return Err(CodecError::new(
            ErrorKind::MalformedToken,
            format!("expected type {:#04x}, found {:#04x}", type_byte, magic),
        ));
    }
    let Some(size) = rest.get(..3) else {
        return Err(CodecError::truncated("header size field"));
    };
    let size = usize::from(size[0]) | usize::from(size[1]) << 8 | usize::from(size[2]) << 16;
    Ok((size, &rest[3..]))
}

pub(crate) fn write_gba_header(out: &mut Vec<u8>, type_byte: u8, size: usize) -> Res<()> {
    if size > 0xFF_FFFF {
        return Err(CodecError::new(
            ErrorKind::InvalidRange,
            format!("{} bytes does not fit a 24-bit size field", size),
        ));
    }
    out.push(type_byte);
    out.extend_from_slice(&(size as u32).to_le_bytes()[..3]);
    Ok(())
}

/// Sequential reads over a compressed body, with truncation reported as
/// `TruncatedInput` instead of a panic.
pub(crate) struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        ByteReader { data, pos: 0 }
    }

    pub fn u8(&mut self) -> Res<u8> {
        let b = *self.data.get(self.pos).ok_or_else(|| CodecError::truncated("byte"))?;
        self.pos += 1;
        Ok(b)
    }

    pub fn u16_le(&mut self) -> Res<u16> {
        Ok(u16::from_le_bytes([self.u8()?, self.u8()?]))
    }

    pub fn u16_be(&mut self) -> Res<u16> {
        Ok(u16::from_be_bytes([self.u8()?, self.u8()?]))
    }

    pub fn u32_le(&mut self) -> Res<u32> {
        Ok(u32::from_le_bytes([self.u8()?, self.u8()?, self.u8()?, self.u8()?]))
    }

    pub fn take(&mut self, n: usize) -> Res<&'a [u8]> {
        let bytes = self
            .data
            .get(self.pos..self.pos + n)
            .ok_or_else(|| CodecError::truncated("byte run"))?;
        self.pos += n;
        Ok(bytes)
    }
}

impl ErrorContext for ByteReader<'_> {
    fn describe(&self) -> Option<String> {
        Some(format!("at compressed byte {}", self.pos))
    }
}

/// Copy `length` bytes from `displacement` back, one at a time so overlapping
/// copies reproduce freshly written bytes.
#[allow(clippy::indexing_slicing)]
pub(crate) fn copy_match(out: &mut Vec<u8>, displacement: usize, length: usize) -> Res<()> {
    if displacement == 0 || displacement > out.len() {
        return Err(CodecError::new(
            ErrorKind::MalformedToken,
            format!("displacement {} with only {} bytes decoded", displacement, out.len()),
        ));
    }
    for _ in 0..length {
        let b = out[out.len() - displacement];
        out.push(b);
    }
    Ok(())
}
