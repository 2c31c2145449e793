//! Swarm-wide piece availability counts.

use std::collections::HashMap;

use super::{Bitfield, PieceIndex};

/// Number of known holders for each piece in a swarm.
///
/// Maintained by whichever component tracks peer bitfields and `have`
/// messages. Piece selectors only read it. Pieces never observed in the
/// swarm have no entry and read as zero holders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RarityTable {
    holders: HashMap<PieceIndex, u32>,
}

impl RarityTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Known holder count for `piece`, zero when unobserved.
    pub fn holders(&self, piece: PieceIndex) -> u32 {
        self.holders.get(&piece).copied().unwrap_or(0)
    }

    /// Whether the piece has an entry at all, including an explicit zero.
    pub fn is_observed(&self, piece: PieceIndex) -> bool {
        self.holders.contains_key(&piece)
    }

    /// Overwrites the holder count of a piece.
    pub fn set_holders(&mut self, piece: PieceIndex, count: u32) {
        self.holders.insert(piece, count);
    }

    /// Records a peer's `have` announcement.
    pub fn record_have(&mut self, piece: PieceIndex) {
        let count = self.holders.entry(piece).or_insert(0);
        *count = count.saturating_add(1);
    }

    /// Records every piece advertised in a peer's bitfield.
    pub fn record_bitfield(&mut self, bitfield: &Bitfield) {
        for piece in bitfield.pieces() {
            self.record_have(piece);
        }
    }

    /// Removes a departed peer's pieces from the counts.
    pub fn forget_bitfield(&mut self, bitfield: &Bitfield) {
        for piece in bitfield.pieces() {
            if let Some(count) = self.holders.get_mut(&piece) {
                *count = count.saturating_sub(1);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.holders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.holders.is_empty()
    }
}

impl FromIterator<(PieceIndex, u32)> for RarityTable {
    fn from_iter<I: IntoIterator<Item = (PieceIndex, u32)>>(iter: I) -> Self {
        Self {
            holders: iter.into_iter().collect(),
        }
    }
}

impl<const N: usize> From<[(u32, u32); N]> for RarityTable {
    fn from(entries: [(u32, u32); N]) -> Self {
        entries
            .into_iter()
            .map(|(piece, count)| (PieceIndex::new(piece), count))
            .collect()
    }
}
