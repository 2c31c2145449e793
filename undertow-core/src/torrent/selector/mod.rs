//! Piece selection strategies.
//!
//! A [`PieceSelector`] orders candidate pieces for request. It is attached to
//! a job once and shared read-only by every peer task of that job. Sequential
//! order suits streaming, rarest-first keeps scarce pieces alive in the swarm,
//! and the randomized variant spreads requests of many peers over pieces of
//! equal rarity. [`SelectorAdapter`] lets a ranking-only strategy fill the same
//! slot.

mod adapter;
mod rarest_first;
mod sequential;

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

pub use adapter::{PieceRanking, SelectorAdapter};
pub use rarest_first::{RandomSource, RarestFirstSelector};
pub use sequential::SequentialSelector;

use super::{Bitfield, PieceIndex, RarityTable};

/// Errors surfaced by piece selection.
#[derive(Debug, thiserror::Error)]
pub enum SelectionError {
    #[error("Ranking failed for piece {piece}: {reason}")]
    RankingFailed { piece: PieceIndex, reason: String },
}

/// Named built-in strategies, used by configuration and the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectorKind {
    /// Ascending piece index
    Sequential,
    /// Fewest holders first, index breaks ties
    Rarest,
    /// Fewest holders first, random order among equally rare pieces
    RandomizedRarest,
}

impl FromStr for SelectorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sequential" => Ok(SelectorKind::Sequential),
            "rarest" | "rarest-first" => Ok(SelectorKind::Rarest),
            "randomized-rarest" | "random-rarest" => Ok(SelectorKind::RandomizedRarest),
            _ => Err(format!("Invalid selector: {s}")),
        }
    }
}

impl fmt::Display for SelectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectorKind::Sequential => write!(f, "sequential"),
            SelectorKind::Rarest => write!(f, "rarest"),
            SelectorKind::RandomizedRarest => write!(f, "randomized-rarest"),
        }
    }
}

/// Strategy for ordering the pieces a job still needs.
#[derive(Debug, Clone)]
pub enum PieceSelector {
    Sequential(SequentialSelector),
    RarestFirst(RarestFirstSelector),
    Adapted(SelectorAdapter),
}

impl PieceSelector {
    pub fn sequential() -> Self {
        PieceSelector::Sequential(SequentialSelector)
    }

    pub fn rarest() -> Self {
        PieceSelector::RarestFirst(RarestFirstSelector::rarest())
    }

    /// Randomized rarest-first drawing from thread-local entropy.
    pub fn randomized_rarest() -> Self {
        PieceSelector::RarestFirst(RarestFirstSelector::randomized_rarest())
    }

    /// Randomized rarest-first with a reproducible random source.
    pub fn randomized_rarest_seeded(seed: u64) -> Self {
        PieceSelector::RarestFirst(
            RarestFirstSelector::randomized_rarest().with_random_source(RandomSource::Seeded(seed)),
        )
    }

    /// Wraps a ranking-only strategy.
    pub fn adapted(ranking: impl PieceRanking + 'static) -> Self {
        PieceSelector::Adapted(SelectorAdapter::new(ranking))
    }

    /// Builds a built-in strategy. `seed` only affects the randomized variant.
    pub fn from_kind(kind: SelectorKind, seed: Option<u64>) -> Self {
        match (kind, seed) {
            (SelectorKind::Sequential, _) => Self::sequential(),
            (SelectorKind::Rarest, _) => Self::rarest(),
            (SelectorKind::RandomizedRarest, Some(seed)) => Self::randomized_rarest_seeded(seed),
            (SelectorKind::RandomizedRarest, None) => Self::randomized_rarest(),
        }
    }

    /// Built-in kind, `None` for adapted strategies.
    pub fn kind(&self) -> Option<SelectorKind> {
        match self {
            PieceSelector::Sequential(_) => Some(SelectorKind::Sequential),
            PieceSelector::RarestFirst(selector) if selector.is_randomized() => {
                Some(SelectorKind::RandomizedRarest)
            }
            PieceSelector::RarestFirst(_) => Some(SelectorKind::Rarest),
            PieceSelector::Adapted(_) => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self.kind() {
            Some(SelectorKind::Sequential) => "sequential",
            Some(SelectorKind::Rarest) => "rarest",
            Some(SelectorKind::RandomizedRarest) => "randomized-rarest",
            None => "adapted",
        }
    }

    /// Orders `candidates` for request.
    ///
    /// Duplicate candidates are collapsed and pieces already in `local_have`
    /// are dropped. Neither `rarity` nor `local_have` is modified.
    ///
    /// # Errors
    ///
    /// - `SelectionError::RankingFailed` - An adapted ranking failed for some piece
    pub fn select<I>(
        &self,
        candidates: I,
        rarity: &RarityTable,
        local_have: &Bitfield,
    ) -> Result<Selection, SelectionError>
    where
        I: IntoIterator<Item = PieceIndex>,
    {
        let remaining = remaining_candidates(candidates, local_have);
        match self {
            PieceSelector::Sequential(selector) => Ok(selector.order(remaining)),
            PieceSelector::RarestFirst(selector) => Ok(selector.order(remaining, rarity)),
            PieceSelector::Adapted(adapter) => adapter.order(remaining),
        }
    }

    /// Orders the pieces a requesting peer advertises that we still lack.
    ///
    /// # Errors
    ///
    /// - `SelectionError::RankingFailed` - An adapted ranking failed for some piece
    pub fn select_from_peer(
        &self,
        peer_have: &Bitfield,
        rarity: &RarityTable,
        local_have: &Bitfield,
    ) -> Result<Selection, SelectionError> {
        self.select(peer_have.pieces(), rarity, local_have)
    }
}

impl Default for PieceSelector {
    fn default() -> Self {
        Self::randomized_rarest()
    }
}

/// Unique candidates not yet held locally, in ascending index order.
fn remaining_candidates<I>(candidates: I, local_have: &Bitfield) -> Vec<PieceIndex>
where
    I: IntoIterator<Item = PieceIndex>,
{
    candidates
        .into_iter()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .filter(|&piece| !local_have.has_piece(piece))
        .collect()
}

/// Ordered pieces produced by one selection call.
///
/// Finite and independent of any other call; iterating it consumes only this
/// result.
#[derive(Debug, Clone)]
pub struct Selection {
    pieces: std::vec::IntoIter<PieceIndex>,
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        self.pieces.len() == 0
    }
}

impl From<Vec<PieceIndex>> for Selection {
    fn from(pieces: Vec<PieceIndex>) -> Self {
        Self {
            pieces: pieces.into_iter(),
        }
    }
}

impl FromIterator<PieceIndex> for Selection {
    fn from_iter<I: IntoIterator<Item = PieceIndex>>(iter: I) -> Self {
        Self::from(iter.into_iter().collect::<Vec<_>>())
    }
}

impl Iterator for Selection {
    type Item = PieceIndex;

    fn next(&mut self) -> Option<Self::Item> {
        self.pieces.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.pieces.size_hint()
    }
}

impl ExactSizeIterator for Selection {}

#[cfg(test)]
pub(crate) fn pieces(indices: &[u32]) -> Vec<PieceIndex> {
    indices.iter().copied().map(PieceIndex::new).collect()
}

#[cfg(test)]
pub(crate) fn ordered(selection: Selection) -> Vec<u32> {
    selection.map(PieceIndex::as_u32).collect()
}
