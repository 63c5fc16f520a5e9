use super::{bitmap::BitVector, chain::DocumentRank, error::DsseError};
use rayon::prelude::*;
use std::fmt::Display;

/// Rank interval occupied, in sorted-by-value order, by the documents holding one domain value.
///
/// `low_rank` counts documents with a strictly smaller value and is defined for every value of the domain.
/// `high_rank` is the rank of the last document holding the value, or `None` when no document holds it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RankBucket {
    pub low_rank: usize,
    pub high_rank: Option<usize>,
}

impl RankBucket {
    /// Wire form of an absent `high_rank`.
    pub const SENTINEL: i64 = -1;

    pub const fn absent(low_rank: usize) -> RankBucket {
        RankBucket { low_rank, high_rank: None }
    }

    pub const fn present(low_rank: usize, high_rank: usize) -> RankBucket {
        RankBucket {
            low_rank,
            high_rank: Some(high_rank),
        }
    }

    #[inline(always)]
    pub const fn is_present(&self) -> bool {
        self.high_rank.is_some()
    }

    pub fn high_rank_on_wire(&self) -> i64 {
        self.high_rank.map_or(Self::SENTINEL, |rank| rank as i64)
    }

    /// Documents whose value is strictly smaller than this bucket's value.
    pub fn less_than(&self, corpus_len: usize) -> BitVector {
        BitVector::less_than(corpus_len, self.low_rank)
    }

    /// Documents holding exactly this bucket's value. Fails for an absent value, which has no block to select.
    pub fn equal_block(&self, value: u32, corpus_len: usize) -> Result<BitVector, DsseError> {
        match self.high_rank {
            Some(high_rank) => Ok(BitVector::equal_range(self.low_rank, high_rank, corpus_len)),
            None => Err(DsseError::AbsentUpperBound(value)),
        }
    }

    /// Rebuilds a bucket from the ranks a chain search returned for `value`.
    ///
    /// The encoder writes the low rank before the high rank, and the backward walk discovers them newest first,
    /// so the current bucket is `[high, low, ..]`. Older entries, left behind by a previous encoding batch, are ignored.
    pub fn from_search_result(value: u32, ranks: &[DocumentRank], corpus_len: usize) -> Result<RankBucket, DsseError> {
        let [high, low, ..] = ranks else {
            return Err(DsseError::IncompleteRankBucket { value, found: ranks.len() });
        };

        let high = high.to_i64()?;
        let low = low.to_i64()?;

        if low < 0 || low as usize > corpus_len {
            return Err(DsseError::RankOutsideCorpus { rank: low, corpus_len });
        }

        let high_rank = match high {
            Self::SENTINEL => None,
            rank if rank >= low && (rank as usize) < corpus_len => Some(rank as usize),
            rank => return Err(DsseError::RankOutsideCorpus { rank, corpus_len }),
        };

        Ok(RankBucket {
            low_rank: low as usize,
            high_rank,
        })
    }
}

impl Display for RankBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.low_rank, self.high_rank_on_wire())
    }
}

/// Stable sort of `values` into rank order, returning, for each rank, the index of the input pair holding it.
pub fn sort_into_rank_order(values: &[u32]) -> Vec<usize> {
    let mut order = (0..values.len()).collect::<Vec<usize>>();
    order.par_sort_by_key(|&idx| values[idx]);
    order
}

/// Builds one bucket per domain value from the values of a corpus already arranged in rank order.
///
/// Each distinct value's contiguous block fixes its `[low, high]` span; every value without a block then inherits
/// the count of documents below it from the end of the nearest block before it.
pub fn build_from_sorted(sorted_values: &[u32], domain_size: u32) -> Vec<RankBucket> {
    let mut buckets = vec![RankBucket::default(); domain_size as usize];

    let Some(&first) = sorted_values.first() else {
        return buckets;
    };

    let mut block_value = first;
    let mut block_start = 0usize;

    for (rank, &value) in sorted_values.iter().enumerate().skip(1) {
        if value != block_value {
            buckets[block_value as usize] = RankBucket::present(block_start, rank - 1);
            block_value = value;
            block_start = rank;
        }
    }
    buckets[block_value as usize] = RankBucket::present(block_start, sorted_values.len() - 1);

    let mut carried_low_rank = 0usize;
    for bucket in buckets.iter_mut() {
        match bucket.high_rank {
            Some(high_rank) => carried_low_rank = high_rank + 1,
            None => bucket.low_rank = carried_low_rank,
        }
    }

    buckets
}
