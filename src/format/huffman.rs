//! Nintendo Huffman (BIOS types 0x24 and 0x28).
//!
//! Header: type byte (`0x20 | data_width`), u24 LE decompressed size. Then a
//! serialized tree: one size byte `N` (tree region = `(N + 1) * 2` bytes
//! including the size byte, zero-padded so the bitstream starts 4-aligned),
//! the root node, and node pairs. An internal node byte holds a 6-bit pair
//! offset — children live at `(addr & !1) + 2 + 2 * offset` — plus bit 7
//! (branch-0 child is a leaf) and bit 6 (branch-1 child is a leaf). A leaf
//! byte is the symbol itself.
//!
//! The bitstream is a sequence of 32-bit words, each consumed from bit 31
//! down; the LE/BE variants differ only in the byte order of those words.
//! 4-bit mode codes nibbles, low nibble of each output byte first.
//!
//! The encoder caps code depth at one data word, assigns canonical codes
//! over the (possibly limited) lengths, and serializes the tree those codes
//! describe. Serializing breadth-first keeps sibling pairs adjacent to
//! their parents; a tree whose layout still needs a pair offset above 0x3F
//! is reported as `HuffmanCapExceeded`.

use std::collections::VecDeque;

use crate::core::error::{CodecError, ErrorKind, Res};
use crate::core::huffman::{canonical_codes, limit_code_lengths, HuffmanNode, HuffmanTree};
use crate::format::{read_gba_header, write_gba_header};

/// Codes travel in 32-bit words, so no code may outgrow one word. Only
/// pathological frequency skews ever hit this.
const MAX_CODE_BITS: u8 = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Width {
    Nibble,
    Byte,
}

impl Width {
    fn type_byte(self) -> u8 {
        match self {
            Width::Nibble => 0x24,
            Width::Byte => 0x28,
        }
    }

    fn symbol_count(self) -> usize {
        match self {
            Width::Nibble => 16,
            Width::Byte => 256,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Order {
    Le,
    Be,
}

#[allow(clippy::indexing_slicing)]
pub(crate) fn decode(input: &[u8], width: Width, order: Order) -> Res<Vec<u8>> {
    let (size, body) = read_gba_header(input, width.type_byte())?;
    if size == 0 {
        return Ok(Vec::new());
    }
    let tree_size = *body.first().ok_or_else(|| CodecError::truncated("tree size byte"))?;
    let data_at = (usize::from(tree_size) + 1) * 2;
    if body.len() < data_at {
        return Err(CodecError::truncated("huffman tree table"));
    }

    let node = |addr: usize| -> Res<u8> {
        body.get(addr).copied().ok_or_else(|| {
            CodecError::new(ErrorKind::MalformedToken, format!("tree walk left the table at {}", addr))
        })
    };

    let mut symbols = Vec::new();
    let needed = match width {
        Width::Nibble => size * 2,
        Width::Byte => size,
    };
    let mut addr = 1usize;
    let mut word = 0u32;
    let mut bits_left = 0u32;
    let mut pos = data_at;
    while symbols.len() < needed {
        if bits_left == 0 {
            let Some(bytes) = body.get(pos..pos + 4) else {
                return Err(CodecError::truncated("huffman bitstream word"));
            };
            word = match order {
                Order::Le => u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
                Order::Be => u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            };
            bits_left = 32;
            pos += 4;
        }
        let branch = (word >> 31) & 1;
        word <<= 1;
        bits_left -= 1;

        let v = node(addr)?;
        let pair = (addr & !1) + 2 + 2 * usize::from(v & 0x3F);
        let is_leaf = if branch == 0 { v & 0x80 != 0 } else { v & 0x40 != 0 };
        addr = pair + branch as usize;
        if is_leaf {
            symbols.push(node(addr)?);
            addr = 1;
        }
    }

    let out = match width {
        Width::Nibble => symbols.chunks_exact(2).map(|pair| pair[0] | pair[1] << 4).collect(),
        Width::Byte => symbols,
    };
    Ok(out)
}

#[allow(clippy::indexing_slicing)]
pub(crate) fn encode(input: &[u8], out: &mut Vec<u8>, width: Width, order: Order) -> Res<()> {
    write_gba_header(out, width.type_byte(), input.len())?;
    if input.is_empty() {
        return Ok(());
    }

    let symbols: Vec<u8> = match width {
        Width::Nibble => input.iter().flat_map(|&b| [b & 0xF, b >> 4]).collect(),
        Width::Byte => input.to_vec(),
    };
    let mut frequencies = vec![0u32; width.symbol_count()];
    for &s in &symbols {
        frequencies[usize::from(s)] += 1;
    }
    // Build the optimal lengths, cap them to one data word, and serialize
    // the tree the canonical codes describe; the wire codes and the node
    // table then agree by construction (branch 0 = left).
    let tree = HuffmanTree::from_frequencies(&frequencies)?;
    let mut lengths = tree.code_lengths();
    limit_code_lengths(&mut lengths, &frequencies, MAX_CODE_BITS)?;
    let codes = canonical_codes(&lengths);
    let tree = HuffmanTree::from_codes(&codes)?;
    log::debug!("huffman tree: {} nodes for {} symbols", tree.node_count(), symbols.len());

    out.extend_from_slice(&serialize_tree(&tree)?);

    let mut code_of = vec![None; width.symbol_count()];
    for c in &codes {
        code_of[usize::from(c.symbol)] = Some((c.code, c.length));
    }

    let mut word = 0u32;
    let mut filled = 0u32;
    let flush = |word: u32, out: &mut Vec<u8>| match order {
        Order::Le => out.extend_from_slice(&word.to_le_bytes()),
        Order::Be => out.extend_from_slice(&word.to_be_bytes()),
    };
    for &s in &symbols {
        let (code, length) = code_of[usize::from(s)]
            .ok_or_else(|| CodecError::new(ErrorKind::InvalidRange, format!("symbol {} has no code", s)))?;
        for i in (0..length).rev() {
            let bit = (code >> i) & 1;
            word |= bit << (31 - filled);
            filled += 1;
            if filled == 32 {
                flush(word, out);
                word = 0;
                filled = 0;
            }
        }
    }
    if filled > 0 {
        flush(word, out);
    }
    Ok(())
}

/// Breadth-first node table: size byte, root, then child pairs in allocation
/// order. Zero-padded so the table length is a multiple of four.
#[allow(clippy::indexing_slicing)]
fn serialize_tree(tree: &HuffmanTree) -> Res<Vec<u8>> {
    let node_count = tree.node_count();
    let region = (1 + node_count + 3) & !3;
    let mut table = vec![0u8; region];
    table[0] = (region / 2 - 1) as u8;

    let mut queue = VecDeque::new();
    queue.push_back((tree.root(), 1usize));
    let mut next_pair = 2usize;
    while let Some((node, addr)) = queue.pop_front() {
        match *tree.node(node) {
            HuffmanNode::Leaf { symbol, .. } => table[addr] = symbol as u8,
            HuffmanNode::Internal { left, right, .. } => {
                let offset = (next_pair - (addr & !1) - 2) / 2;
                if offset > 0x3F {
                    return Err(CodecError::new(
                        ErrorKind::HuffmanCapExceeded,
                        format!("pair offset {} does not fit the 6-bit node field", offset),
                    ));
                }
                let mut v = offset as u8;
                if matches!(tree.node(left), HuffmanNode::Leaf { .. }) {
                    v |= 0x80;
                }
                if matches!(tree.node(right), HuffmanNode::Leaf { .. }) {
                    v |= 0x40;
                }
                table[addr] = v;
                queue.push_back((left, next_pair));
                queue.push_back((right, next_pair + 1));
                next_pair += 2;
            }
        }
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::Format;

    #[test_log::test]
    fn round_trips_in_all_four_variants() {
        let inputs: Vec<Vec<u8>> = vec![
            b"A".to_vec(),
            b"hello huffman".to_vec(),
            b"the quick brown fox jumps over the lazy dog".repeat(8),
            vec![0x5A; 0x100],
            (0u8..16).cycle().take(0x133).collect(),
        ];
        for format in [Format::Huffman4Le, Format::Huffman4Be, Format::Huffman8Le, Format::Huffman8Be] {
            for input in &inputs {
                let packed = format.encode_from(input).unwrap();
                assert_eq!(&format.decode_from(&packed).unwrap(), input, "{:?}", format);
            }
        }
    }

    #[test_log::test]
    fn uniform_input_gets_one_bit_codes() {
        // All 0x5A: both nibbles degenerate to depth-1 trees, so the payload
        // is one bit per nibble — size*2 bits, padded to whole words.
        let input = vec![0x5Au8; 0x80];
        let packed = Format::Huffman4Le.encode_from(&input).unwrap();
        let tree_region = (usize::from(packed[4]) + 1) * 2;
        let data_len = packed.len() - 4 - tree_region;
        assert_eq!(data_len, (input.len() * 2).div_ceil(32) * 4);
        assert_eq!(Format::Huffman4Le.decode_from(&packed).unwrap(), input);
    }

    #[test_log::test]
    fn empty_input_is_a_bare_header() {
        let packed = Format::Huffman8Le.encode_from(b"").unwrap();
        assert_eq!(packed, vec![0x28, 0, 0, 0]);
        assert_eq!(Format::Huffman8Le.decode_from(&packed).unwrap(), Vec::<u8>::new());
    }

    #[test_log::test]
    fn le_and_be_payloads_differ_only_in_word_order() {
        let input = b"abababababab".to_vec();
        let le = Format::Huffman8Le.encode_from(&input).unwrap();
        let be = Format::Huffman8Be.encode_from(&input).unwrap();
        let tree_region = (usize::from(le[4]) + 1) * 2;
        let (le_data, be_data) = (&le[4 + tree_region..], &be[4 + tree_region..]);
        let swapped: Vec<u8> = be_data
            .chunks_exact(4)
            .flat_map(|w| [w[3], w[2], w[1], w[0]])
            .collect();
        assert_eq!(le_data, &swapped[..]);
    }

    #[test_log::test]
    fn truncated_bitstream_is_reported() {
        let input = b"some huffman coded text".to_vec();
        let packed = Format::Huffman8Le.encode_from(&input).unwrap();
        let err = Format::Huffman8Le.decode_from(&packed[..packed.len() - 4]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TruncatedInput);
    }
}
