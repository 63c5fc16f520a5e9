use super::{
    error::DsseError,
    params::{BITS_PER_BLOCK, PARALLEL_BLOCK_THRESHOLD},
};
use rayon::prelude::*;
use std::fmt::Display;

/// Fixed-length bit vector, one bit per sorted-rank position, packed into 64-bit blocks.
///
/// Bits at positions `>= len` are always zero. Every constructor and every operation returning a new vector
/// preserves that, so padding bits are never observable through `count_ones`, `iter_ones` or equality.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BitVector {
    len: usize,
    blocks: Vec<u64>,
}

impl BitVector {
    /// All-zero vector of `n` bits.
    pub fn empty(n: usize) -> BitVector {
        BitVector {
            len: n,
            blocks: vec![0; n.div_ceil(BITS_PER_BLOCK)],
        }
    }

    /// Sets bits `[0, k)`, i.e. "rank strictly less than `k`". `k` is clamped to `n`.
    pub fn less_than(n: usize, k: usize) -> BitVector {
        let mut bv = BitVector::empty(n);
        let k = k.min(n);

        let full_blocks = k / BITS_PER_BLOCK;
        bv.blocks[..full_blocks].fill(u64::MAX);

        let remaining_bits = k % BITS_PER_BLOCK;
        if remaining_bits > 0 {
            bv.blocks[full_blocks] = low_bits_mask(remaining_bits);
        }

        bv
    }

    /// Sets bits `[a, b]`, both ends inclusive. Empty if `a > b` or `a >= n`; `b` is clamped to `n - 1`.
    pub fn equal_range(a: usize, b: usize, n: usize) -> BitVector {
        let mut bv = BitVector::empty(n);
        if n == 0 || a > b || a >= n {
            return bv;
        }

        let b = b.min(n - 1);

        let start_block = a / BITS_PER_BLOCK;
        let end_block = b / BITS_PER_BLOCK;
        let start_offset = a % BITS_PER_BLOCK;
        let end_offset = b % BITS_PER_BLOCK;

        if start_block == end_block {
            bv.blocks[start_block] = low_bits_mask(end_offset - start_offset + 1) << start_offset;
        } else {
            bv.blocks[start_block] = u64::MAX << start_offset;
            bv.blocks[start_block + 1..end_block].fill(u64::MAX);
            bv.blocks[end_block] = low_bits_mask(end_offset + 1);
        }

        bv
    }

    #[inline(always)]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[inline(always)]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, index: usize) -> Result<bool, DsseError> {
        let (block_idx, bit_pos) = self.locate(index)?;
        Ok((self.blocks[block_idx] >> bit_pos) & 1 == 1)
    }

    pub fn set(&mut self, index: usize) -> Result<(), DsseError> {
        let (block_idx, bit_pos) = self.locate(index)?;
        self.blocks[block_idx] |= 1 << bit_pos;
        Ok(())
    }

    pub fn clear(&mut self, index: usize) -> Result<(), DsseError> {
        let (block_idx, bit_pos) = self.locate(index)?;
        self.blocks[block_idx] &= !(1 << bit_pos);
        Ok(())
    }

    /// Bitwise NOT, with padding bits beyond `len` forced back to zero.
    pub fn complement(&self) -> BitVector {
        let mut blocks = self.blocks.clone();

        if blocks.len() >= PARALLEL_BLOCK_THRESHOLD {
            blocks.par_iter_mut().for_each(|block| *block = !*block);
        } else {
            blocks.iter_mut().for_each(|block| *block = !*block);
        }

        let mut res = BitVector { len: self.len, blocks };
        res.mask_padding();
        res
    }

    pub fn or(&self, rhs: &BitVector) -> Result<BitVector, DsseError> {
        self.combine(rhs, |l, r| l | r)
    }

    pub fn and(&self, rhs: &BitVector) -> Result<BitVector, DsseError> {
        self.combine(rhs, |l, r| l & r)
    }

    pub fn count_ones(&self) -> usize {
        self.blocks.iter().map(|block| block.count_ones() as usize).sum()
    }

    /// Positions of set bits, in ascending rank order.
    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.blocks.iter().enumerate().flat_map(|(block_idx, &block)| {
            let mut remaining = block;
            std::iter::from_fn(move || {
                if remaining == 0 {
                    return None;
                }

                let bit_pos = remaining.trailing_zeros() as usize;
                remaining &= remaining - 1;

                Some(block_idx * BITS_PER_BLOCK + bit_pos)
            })
        })
    }

    fn combine<F>(&self, rhs: &BitVector, op: F) -> Result<BitVector, DsseError>
    where
        F: Fn(u64, u64) -> u64 + Sync + Send,
    {
        if self.len != rhs.len {
            return Err(DsseError::BitVectorLengthMismatch { lhs: self.len, rhs: rhs.len });
        }

        let blocks = if self.blocks.len() >= PARALLEL_BLOCK_THRESHOLD {
            self.blocks.par_iter().zip(rhs.blocks.par_iter()).map(|(&l, &r)| op(l, r)).collect()
        } else {
            self.blocks.iter().zip(rhs.blocks.iter()).map(|(&l, &r)| op(l, r)).collect()
        };

        Ok(BitVector { len: self.len, blocks })
    }

    #[inline(always)]
    fn locate(&self, index: usize) -> Result<(usize, usize), DsseError> {
        if index >= self.len {
            return Err(DsseError::BitIndexOutOfBounds { index, len: self.len });
        }

        Ok((index / BITS_PER_BLOCK, index % BITS_PER_BLOCK))
    }

    fn mask_padding(&mut self) {
        let remaining_bits = self.len % BITS_PER_BLOCK;
        if remaining_bits > 0 {
            if let Some(last) = self.blocks.last_mut() {
                *last &= low_bits_mask(remaining_bits);
            }
        }
    }
}

impl Display for BitVector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for idx in 0..self.len {
            let bit = (self.blocks[idx / BITS_PER_BLOCK] >> (idx % BITS_PER_BLOCK)) & 1;
            write!(f, "{}", bit)?;
        }
        Ok(())
    }
}

/// Mask with the lowest `num_bits` bits set, for `num_bits` in `1..=64`.
#[inline(always)]
const fn low_bits_mask(num_bits: usize) -> u64 {
    u64::MAX >> (BITS_PER_BLOCK - num_bits)
}
