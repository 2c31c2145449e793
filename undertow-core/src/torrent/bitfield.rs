//! Piece possession bitsets in BitTorrent wire layout.

use super::PieceIndex;

/// Set of pieces held by a peer or by the local client.
///
/// Piece `i` is stored in byte `i / 8`, counting from the most significant
/// bit. Bits past `piece_count` are kept at zero so that two bitfields with
/// the same pieces compare equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitfield {
    bits: Vec<u8>,
    piece_count: u32,
}

impl Bitfield {
    /// Creates an empty bitfield for `piece_count` pieces.
    pub fn new(piece_count: u32) -> Self {
        Self {
            bits: vec![0; Self::byte_len(piece_count)],
            piece_count,
        }
    }

    /// Creates a bitfield with every piece set.
    pub fn full(piece_count: u32) -> Self {
        let mut bitfield = Self {
            bits: vec![0xFF; Self::byte_len(piece_count)],
            piece_count,
        };
        bitfield.clear_spare_bits();
        bitfield
    }

    /// Creates a bitfield from a peer's `bitfield` payload.
    ///
    /// Short payloads are zero-extended, long payloads truncated, and spare
    /// bits cleared.
    pub fn from_bytes(bytes: &[u8], piece_count: u32) -> Self {
        let mut bits = bytes.to_vec();
        bits.resize(Self::byte_len(piece_count), 0);

        let mut bitfield = Self { bits, piece_count };
        bitfield.clear_spare_bits();
        bitfield
    }

    /// Creates a bitfield with the given pieces set. Out-of-range pieces are ignored.
    pub fn from_pieces(piece_count: u32, pieces: impl IntoIterator<Item = PieceIndex>) -> Self {
        let mut bitfield = Self::new(piece_count);
        for piece in pieces {
            bitfield.set_piece(piece);
        }
        bitfield
    }

    pub fn has_piece(&self, piece: PieceIndex) -> bool {
        if piece.as_u32() >= self.piece_count {
            return false;
        }
        let (byte, mask) = Self::locate(piece);
        self.bits[byte] & mask != 0
    }

    pub fn set_piece(&mut self, piece: PieceIndex) {
        if piece.as_u32() < self.piece_count {
            let (byte, mask) = Self::locate(piece);
            self.bits[byte] |= mask;
        }
    }

    pub fn clear_piece(&mut self, piece: PieceIndex) {
        if piece.as_u32() < self.piece_count {
            let (byte, mask) = Self::locate(piece);
            self.bits[byte] &= !mask;
        }
    }

    /// Number of pieces set.
    pub fn count(&self) -> u32 {
        self.bits.iter().map(|byte| byte.count_ones()).sum()
    }

    pub fn is_complete(&self) -> bool {
        self.count() == self.piece_count
    }

    pub fn piece_count(&self) -> u32 {
        self.piece_count
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bits
    }

    /// Iterates over set pieces in ascending order.
    pub fn pieces(&self) -> impl Iterator<Item = PieceIndex> + '_ {
        (0..self.piece_count)
            .map(PieceIndex::new)
            .filter(|&piece| self.has_piece(piece))
    }

    fn byte_len(piece_count: u32) -> usize {
        (piece_count as usize).div_ceil(8)
    }

    fn locate(piece: PieceIndex) -> (usize, u8) {
        let index = piece.as_usize();
        (index / 8, 0x80 >> (index % 8))
    }

    fn clear_spare_bits(&mut self) {
        let spare = self.bits.len() * 8 - self.piece_count as usize;
        if spare > 0 {
            if let Some(last) = self.bits.last_mut() {
                *last &= 0xFF << spare;
            }
        }
    }
}
