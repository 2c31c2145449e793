//! In-order piece selection.

use super::Selection;
use crate::torrent::PieceIndex;

/// Requests pieces strictly by ascending index.
///
/// Suits playback while downloading. Ignores rarity entirely, so it can starve
/// the swarm of rare pieces when used by many peers at once.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialSelector;

impl SequentialSelector {
    /// `remaining` arrives unique and ascending.
    pub(super) fn order(&self, remaining: Vec<PieceIndex>) -> Selection {
        Selection::from(remaining)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::super::{PieceSelector, ordered, pieces};
    use crate::torrent::{Bitfield, RarityTable};

    #[test]
    fn test_sequential_ascending_order() {
        let selection = PieceSelector::sequential()
            .select(pieces(&[5, 1, 3]), &RarityTable::new(), &Bitfield::new(8))
            .unwrap();

        assert_eq!(ordered(selection), vec![1, 3, 5]);
    }

    #[test]
    fn test_sequential_ignores_rarity() {
        let rarity = RarityTable::from([(0, 9), (1, 0), (2, 4)]);
        let selection = PieceSelector::sequential()
            .select(pieces(&[2, 1, 0]), &rarity, &Bitfield::new(3))
            .unwrap();

        assert_eq!(ordered(selection), vec![0, 1, 2]);
    }

    proptest! {
        #[test]
        fn prop_sequential_is_strictly_ascending_and_skips_held(
            candidates in proptest::collection::vec(0u32..256, 0..64),
            held in proptest::collection::vec(0u32..256, 0..32),
        ) {
            let have = Bitfield::from_pieces(256, pieces(&held));
            let selection = PieceSelector::sequential()
                .select(pieces(&candidates), &RarityTable::new(), &have)
                .unwrap();
            let order = ordered(selection);

            prop_assert!(order.windows(2).all(|pair| pair[0] < pair[1]));
            prop_assert!(order.iter().all(|piece| !held.contains(piece)));
            for piece in &candidates {
                prop_assert_eq!(order.contains(piece), !held.contains(piece));
            }
        }
    }
}
