//! Rarest-first piece selection with optional randomized tie-breaking.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::Selection;
use crate::torrent::{PieceIndex, RarityTable};

/// Where randomized selection draws its permutations from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RandomSource {
    /// The calling thread's generator; every thread has its own stream.
    #[default]
    Entropy,
    /// ChaCha8 seeded from this value, one stream per selection call.
    Seeded(u64),
}

/// Orders pieces by ascending holder count.
///
/// Deterministic mode breaks ties by piece index. Randomized mode groups
/// pieces of equal holder count and shuffles each group on every call, so
/// peers that start together do not all converge on the same piece.
#[derive(Debug, Clone)]
pub struct RarestFirstSelector {
    randomized: bool,
    source: RandomSource,
    draws: Arc<AtomicU64>,
}

impl RarestFirstSelector {
    pub fn rarest() -> Self {
        Self {
            randomized: false,
            source: RandomSource::Entropy,
            draws: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn randomized_rarest() -> Self {
        Self {
            randomized: true,
            ..Self::rarest()
        }
    }

    /// Replaces the random source used for tie-breaking.
    pub fn with_random_source(mut self, source: RandomSource) -> Self {
        self.source = source;
        self
    }

    pub fn is_randomized(&self) -> bool {
        self.randomized
    }

    pub fn random_source(&self) -> RandomSource {
        self.source
    }

    pub(super) fn order(&self, remaining: Vec<PieceIndex>, rarity: &RarityTable) -> Selection {
        let mut ranked: Vec<(u32, PieceIndex)> = remaining
            .into_iter()
            .map(|piece| (rarity.holders(piece), piece))
            .collect();
        ranked.sort_unstable();

        if !self.randomized {
            return ranked.into_iter().map(|(_, piece)| piece).collect();
        }

        match self.source {
            RandomSource::Entropy => shuffle_buckets(&ranked, &mut rand::rng()),
            RandomSource::Seeded(seed) => {
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                rng.set_stream(self.draws.fetch_add(1, Ordering::Relaxed));
                shuffle_buckets(&ranked, &mut rng)
            }
        }
    }
}

/// Shuffles each run of equal holder count in `ranked`, keeping runs in order.
fn shuffle_buckets<R: Rng + ?Sized>(ranked: &[(u32, PieceIndex)], rng: &mut R) -> Selection {
    let mut order = Vec::with_capacity(ranked.len());
    for bucket in ranked.chunk_by(|a, b| a.0 == b.0) {
        let start = order.len();
        order.extend(bucket.iter().map(|&(_, piece)| piece));
        order[start..].shuffle(rng);
    }
    Selection::from(order)
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeSet, HashMap};

    use proptest::prelude::*;

    use super::super::{PieceSelector, ordered, pieces};
    use super::*;
    use crate::torrent::Bitfield;

    #[test]
    fn test_rarest_orders_by_holder_count() {
        let rarity = RarityTable::from([(1, 3), (2, 1), (3, 2)]);
        let selection = PieceSelector::rarest()
            .select(pieces(&[1, 2, 3]), &rarity, &Bitfield::new(4))
            .unwrap();

        assert_eq!(ordered(selection), vec![2, 3, 1]);
    }

    #[test]
    fn test_unobserved_piece_counts_as_zero_holders() {
        let rarity = RarityTable::from([(1, 0)]);
        let selection = PieceSelector::rarest()
            .select(pieces(&[2, 1]), &rarity, &Bitfield::new(4))
            .unwrap();

        assert_eq!(ordered(selection), vec![1, 2]);

        let rarity = RarityTable::from([(1, 1), (3, 4)]);
        let selection = PieceSelector::rarest()
            .select(pieces(&[1, 2, 3]), &rarity, &Bitfield::new(4))
            .unwrap();

        assert_eq!(ordered(selection), vec![2, 1, 3]);
    }

    #[test]
    fn test_randomized_keeps_buckets_in_rarity_order() {
        let rarity = RarityTable::from([(1, 2), (2, 2), (3, 1), (4, 1), (5, 3)]);
        let selector = PieceSelector::randomized_rarest_seeded(11);

        for _ in 0..50 {
            let order = ordered(
                selector
                    .select(pieces(&[1, 2, 3, 4, 5]), &rarity, &Bitfield::new(8))
                    .unwrap(),
            );

            let mut rarest: Vec<u32> = order[..2].to_vec();
            rarest.sort_unstable();
            let mut middle: Vec<u32> = order[2..4].to_vec();
            middle.sort_unstable();

            assert_eq!(rarest, vec![3, 4]);
            assert_eq!(middle, vec![1, 2]);
            assert_eq!(order[4], 5);
        }
    }

    #[test]
    fn test_seeded_selection_is_reproducible() {
        let rarity = RarityTable::new();
        let candidates = pieces(&[0, 1, 2, 3, 4, 5, 6, 7]);
        let first = PieceSelector::randomized_rarest_seeded(99);
        let second = PieceSelector::randomized_rarest_seeded(99);

        for _ in 0..10 {
            let a = ordered(first.select(candidates.clone(), &rarity, &Bitfield::new(8)).unwrap());
            let b = ordered(second.select(candidates.clone(), &rarity, &Bitfield::new(8)).unwrap());
            assert_eq!(a, b);
        }
    }

    // Randomized mode is intentionally non-deterministic across calls; this
    // checks the permutations of one tie bucket are roughly uniform instead.
    #[test]
    fn test_randomized_tie_permutations_are_uniform() {
        const CALLS: usize = 6000;
        let rarity = RarityTable::from([(0, 1), (1, 1), (2, 1)]);
        let selector = PieceSelector::randomized_rarest_seeded(2024);
        let mut seen: HashMap<Vec<u32>, usize> = HashMap::new();

        for _ in 0..CALLS {
            let order = ordered(
                selector
                    .select(pieces(&[0, 1, 2]), &rarity, &Bitfield::new(3))
                    .unwrap(),
            );
            *seen.entry(order).or_default() += 1;
        }

        assert_eq!(seen.len(), 6, "not every permutation observed: {seen:?}");
        for (order, count) in &seen {
            assert!(
                (800..=1200).contains(count),
                "permutation {order:?} seen {count} times out of {CALLS}"
            );
        }
    }

    #[test]
    fn test_entropy_source_covers_all_permutations() {
        let rarity = RarityTable::new();
        let selector = PieceSelector::randomized_rarest();
        let mut seen = std::collections::HashSet::new();

        for _ in 0..600 {
            seen.insert(ordered(
                selector
                    .select(pieces(&[4, 5, 6]), &rarity, &Bitfield::new(8))
                    .unwrap(),
            ));
        }

        assert_eq!(seen.len(), 6);
    }

    #[test]
    fn test_concurrent_selection_shares_selector() {
        let selector = Arc::new(PieceSelector::randomized_rarest_seeded(5));
        let rarity = Arc::new(RarityTable::from([(0, 3), (1, 1), (2, 1), (3, 2)]));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let selector = Arc::clone(&selector);
                let rarity = Arc::clone(&rarity);
                std::thread::spawn(move || {
                    (0..100)
                        .map(|_| {
                            ordered(
                                selector
                                    .select(pieces(&[0, 1, 2, 3]), &rarity, &Bitfield::new(4))
                                    .unwrap(),
                            )
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        for handle in handles {
            for order in handle.join().unwrap() {
                assert_eq!(order.len(), 4);
                assert_eq!(&order[2..], &[3, 0]);
            }
        }
    }

    #[test]
    fn test_random_source_defaults() {
        let selector = RarestFirstSelector::randomized_rarest();
        assert!(selector.is_randomized());
        assert_eq!(selector.random_source(), RandomSource::Entropy);

        let seeded = selector.with_random_source(RandomSource::Seeded(3));
        assert_eq!(seeded.random_source(), RandomSource::Seeded(3));
        assert!(!RarestFirstSelector::rarest().is_randomized());
    }

    fn rarity_of(holders: &HashMap<u32, u32>) -> RarityTable {
        holders
            .iter()
            .map(|(&piece, &count)| (PieceIndex::new(piece), count))
            .collect()
    }

    fn remaining(candidates: &[u32], held: &[u32]) -> Vec<u32> {
        candidates
            .iter()
            .copied()
            .filter(|piece| !held.contains(piece))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    proptest! {
        #[test]
        fn prop_rarest_sorts_by_holders_then_index(
            candidates in proptest::collection::vec(0u32..64, 0..48),
            holders in proptest::collection::hash_map(0u32..64, 0u32..6, 0..48),
            held in proptest::collection::vec(0u32..64, 0..16),
        ) {
            let have = Bitfield::from_pieces(64, pieces(&held));
            let order = ordered(
                PieceSelector::rarest()
                    .select(pieces(&candidates), &rarity_of(&holders), &have)
                    .unwrap(),
            );

            let mut expected = remaining(&candidates, &held);
            expected.sort_by_key(|piece| (holders.get(piece).copied().unwrap_or(0), *piece));
            prop_assert_eq!(order, expected);
        }

        #[test]
        fn prop_randomized_is_permutation_with_non_decreasing_holders(
            candidates in proptest::collection::vec(0u32..64, 0..48),
            holders in proptest::collection::hash_map(0u32..64, 0u32..4, 0..48),
            held in proptest::collection::vec(0u32..64, 0..16),
            seed in any::<u64>(),
        ) {
            let have = Bitfield::from_pieces(64, pieces(&held));
            let order = ordered(
                PieceSelector::randomized_rarest_seeded(seed)
                    .select(pieces(&candidates), &rarity_of(&holders), &have)
                    .unwrap(),
            );

            let counts: Vec<u32> = order
                .iter()
                .map(|piece| holders.get(piece).copied().unwrap_or(0))
                .collect();
            prop_assert!(counts.windows(2).all(|pair| pair[0] <= pair[1]));

            let mut sorted = order.clone();
            sorted.sort_unstable();
            prop_assert_eq!(sorted, remaining(&candidates, &held));
        }
    }
}
