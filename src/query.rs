use crate::dsse_internals::{bitmap::BitVector, error::DsseError, rank_bucket::RankBucket};
use tracing::debug;

/// Predicates answerable over the indexed value domain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Predicate {
    Lt(u32),
    Le(u32),
    Eq(u32),
    Ge(u32),
    Gt(u32),
    /// Closed interval `[low, high]`.
    Between(u32, u32),
}

/// Supplies the rank bucket of a domain value, e.g. by running a chain search for it.
///
/// `Ok(None)` means nothing was ever indexed for the value.
pub trait BucketSource {
    fn bucket(&self, value: u32) -> Result<Option<RankBucket>, DsseError>;
}

impl BucketSource for [RankBucket] {
    fn bucket(&self, value: u32) -> Result<Option<RankBucket>, DsseError> {
        Ok(self.get(value as usize).copied())
    }
}

/// Answers predicates as boolean algebra over rank-indexed bit vectors, each built from at most two rank buckets.
#[derive(Clone, Copy, Debug)]
pub struct PredicateEngine {
    corpus_len: usize,
    domain_size: u32,
}

impl PredicateEngine {
    pub fn new(corpus_len: usize, domain_size: u32) -> PredicateEngine {
        PredicateEngine { corpus_len, domain_size }
    }

    #[inline(always)]
    pub const fn corpus_len(&self) -> usize {
        self.corpus_len
    }

    #[inline(always)]
    pub const fn domain_size(&self) -> u32 {
        self.domain_size
    }

    pub fn less_than(&self, bucket: &RankBucket) -> BitVector {
        bucket.less_than(self.corpus_len)
    }

    /// Documents equal to the bucket's value; the empty set when no document holds it.
    pub fn equal(&self, value: u32, bucket: &RankBucket) -> Result<BitVector, DsseError> {
        if bucket.is_present() {
            bucket.equal_block(value, self.corpus_len)
        } else {
            Ok(BitVector::empty(self.corpus_len))
        }
    }

    pub fn less_equal(&self, value: u32, bucket: &RankBucket) -> Result<BitVector, DsseError> {
        self.less_than(bucket).or(&self.equal(value, bucket)?)
    }

    pub fn greater_equal(&self, bucket: &RankBucket) -> BitVector {
        self.less_than(bucket).complement()
    }

    pub fn greater_than(&self, value: u32, bucket: &RankBucket) -> Result<BitVector, DsseError> {
        Ok(self.less_equal(value, bucket)?.complement())
    }

    /// `GE(low) AND LE(high)`.
    pub fn between(&self, low_bucket: &RankBucket, high_value: u32, high_bucket: &RankBucket) -> Result<BitVector, DsseError> {
        self.greater_equal(low_bucket).and(&self.less_equal(high_value, high_bucket)?)
    }

    /// Answers `predicate`, fetching the bucket of every bound from `source`.
    ///
    /// Bounds outside of the value domain, an empty corpus, an inverted interval and values that were never indexed all
    /// yield the empty set: absence of data is not a failure.
    pub fn evaluate<S: BucketSource + ?Sized>(&self, source: &S, predicate: Predicate) -> Result<BitVector, DsseError> {
        let empty = BitVector::empty(self.corpus_len);

        let bounds = match predicate {
            Predicate::Between(low, high) => [low, high],
            Predicate::Lt(v) | Predicate::Le(v) | Predicate::Eq(v) | Predicate::Ge(v) | Predicate::Gt(v) => [v, v],
        };
        if self.corpus_len == 0 || bounds[0] > bounds[1] || bounds.iter().any(|&v| v >= self.domain_size) {
            return Ok(empty);
        }

        let Some(bucket) = source.bucket(bounds[0])? else {
            return Ok(empty);
        };

        let answer = match predicate {
            Predicate::Lt(_) => self.less_than(&bucket),
            Predicate::Le(v) => self.less_equal(v, &bucket)?,
            Predicate::Eq(v) => self.equal(v, &bucket)?,
            Predicate::Ge(_) => self.greater_equal(&bucket),
            Predicate::Gt(v) => self.greater_than(v, &bucket)?,
            Predicate::Between(_, high) => {
                let Some(high_bucket) = source.bucket(high)? else {
                    return Ok(empty);
                };
                self.between(&bucket, high, &high_bucket)?
            }
        };

        debug!(?predicate, matches = answer.count_ones(), "Evaluated predicate");
        Ok(answer)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::encoder::RankBucketEncoder;
    use rand::prelude::*;
    use rand_chacha::ChaCha8Rng;
    use test_case::test_case;

    const CORPUS: [(&str, u32); 7] = [("ID1", 22), ("ID2", 20), ("ID3", 18), ("ID4", 25), ("ID5", 30), ("ID6", 22), ("ID7", 18)];
    const DOMAIN_SIZE: u32 = 100;

    fn demo_buckets() -> Vec<RankBucket> {
        RankBucketEncoder::new(DOMAIN_SIZE).unwrap().build_buckets(&CORPUS).unwrap()
    }

    #[test_case(Predicate::Between(18, 22) => vec![0, 1, 2, 3, 4]; "Closed interval over present bounds")]
    #[test_case(Predicate::Between(19, 21) => vec![2]; "Absent bounds snap to the values in between")]
    #[test_case(Predicate::Between(23, 24) => Vec::<usize>::new(); "Interval without any document")]
    #[test_case(Predicate::Between(22, 18) => Vec::<usize>::new(); "Inverted interval")]
    #[test_case(Predicate::Between(0, 99) => vec![0, 1, 2, 3, 4, 5, 6]; "Whole domain")]
    #[test_case(Predicate::Between(18, 100) => Vec::<usize>::new(); "Upper bound outside of domain")]
    #[test_case(Predicate::Lt(22) => vec![0, 1, 2]; "Strictly less than present value")]
    #[test_case(Predicate::Le(22) => vec![0, 1, 2, 3, 4]; "Less or equal to present value")]
    #[test_case(Predicate::Le(21) => vec![0, 1, 2]; "Less or equal to absent value")]
    #[test_case(Predicate::Eq(22) => vec![3, 4]; "Equal to present value")]
    #[test_case(Predicate::Eq(19) => Vec::<usize>::new(); "Equal to absent value")]
    #[test_case(Predicate::Ge(25) => vec![5, 6]; "Greater or equal")]
    #[test_case(Predicate::Gt(25) => vec![6]; "Strictly greater")]
    #[test_case(Predicate::Gt(30) => Vec::<usize>::new(); "Strictly greater than maximum")]
    #[test_case(Predicate::Lt(18) => Vec::<usize>::new(); "Strictly less than minimum")]
    #[test_case(Predicate::Ge(250) => Vec::<usize>::new(); "Bound outside of domain")]
    fn demo_corpus_predicates(predicate: Predicate) -> Vec<usize> {
        let buckets = demo_buckets();
        let engine = PredicateEngine::new(CORPUS.len(), DOMAIN_SIZE);

        engine.evaluate(buckets.as_slice(), predicate).unwrap().iter_ones().collect()
    }

    #[test]
    fn empty_corpus_answers_empty_set() {
        let buckets = RankBucketEncoder::new(DOMAIN_SIZE).unwrap().build_buckets::<&str>(&[]).unwrap();
        let engine = PredicateEngine::new(0, DOMAIN_SIZE);

        for predicate in [Predicate::Between(0, 99), Predicate::Ge(0), Predicate::Le(99)] {
            assert_eq!(engine.evaluate(buckets.as_slice(), predicate), Ok(BitVector::empty(0)));
        }
    }

    #[test]
    fn missing_bucket_answers_empty_set() {
        let engine = PredicateEngine::new(CORPUS.len(), DOMAIN_SIZE);
        let no_buckets: [RankBucket; 0] = [];

        assert_eq!(engine.evaluate(no_buckets.as_slice(), Predicate::Eq(18)), Ok(BitVector::empty(CORPUS.len())));
    }

    #[test]
    fn random_corpora_agree_with_plain_scan() {
        let mut rng = ChaCha8Rng::from_os_rng();

        for _ in 0..16 {
            let domain_size = rng.random_range(1u32..=64);
            let corpus_len = rng.random_range(1usize..=300);
            let pairs = (0..corpus_len).map(|idx| (format!("doc-{}", idx), rng.random_range(0..domain_size))).collect::<Vec<_>>();

            let encoded = RankBucketEncoder::new(domain_size).unwrap().encode(&pairs).unwrap();
            let engine = PredicateEngine::new(corpus_len, domain_size);

            for _ in 0..32 {
                let low = rng.random_range(0..domain_size);
                let high = rng.random_range(0..domain_size);

                let answer = engine.evaluate(encoded.buckets.as_slice(), Predicate::Between(low, high)).unwrap();
                let mut found = encoded.directory.resolve(&answer).unwrap();
                found.sort_unstable();

                let mut expected = pairs
                    .iter()
                    .filter(|(_, value)| *value >= low && *value <= high)
                    .map(|(id, _)| id.as_str())
                    .collect::<Vec<_>>();
                expected.sort_unstable();

                assert_eq!(found, expected, "domain_size = {}, low = {}, high = {}", domain_size, low, high);
            }
        }
    }
}
