//! Adapter from ranking-only strategies to the full selector contract.

use std::fmt;
use std::sync::Arc;

use super::{Selection, SelectionError};
use crate::torrent::PieceIndex;

/// Strategy that only knows how to rank a single piece.
///
/// Lower ranks are requested first. Implemented for plain closures.
pub trait PieceRanking: Send + Sync {
    /// Ranks `piece`.
    ///
    /// # Errors
    ///
    /// - `SelectionError::RankingFailed` - The piece cannot be ranked
    fn rank(&self, piece: PieceIndex) -> Result<i64, SelectionError>;
}

impl<F> PieceRanking for F
where
    F: Fn(PieceIndex) -> Result<i64, SelectionError> + Send + Sync,
{
    fn rank(&self, piece: PieceIndex) -> Result<i64, SelectionError> {
        self(piece)
    }
}

/// Runs a [`PieceRanking`] wherever a piece selector is expected.
///
/// Swarm rarity is ignored. Equal ranks fall back to index order.
#[derive(Clone)]
pub struct SelectorAdapter {
    ranking: Arc<dyn PieceRanking>,
}

impl SelectorAdapter {
    pub fn new(ranking: impl PieceRanking + 'static) -> Self {
        Self {
            ranking: Arc::new(ranking),
        }
    }

    /// The first ranking failure aborts the call.
    pub(super) fn order(&self, remaining: Vec<PieceIndex>) -> Result<Selection, SelectionError> {
        let mut ranked = remaining
            .into_iter()
            .map(|piece| self.ranking.rank(piece).map(|rank| (rank, piece)))
            .collect::<Result<Vec<(i64, PieceIndex)>, SelectionError>>()?;
        ranked.sort_unstable();

        Ok(ranked.into_iter().map(|(_, piece)| piece).collect())
    }
}

impl fmt::Debug for SelectorAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectorAdapter").finish_non_exhaustive()
    }
}
