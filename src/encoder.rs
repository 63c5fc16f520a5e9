use crate::dsse_internals::{bitmap::BitVector, error::DsseError, rank_bucket, rank_bucket::RankBucket, serialization};
use tracing::trace;

/// One `(rank, value)` pair of the token stream; `value` becomes the searchable keyword and `rank` the link payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamItem {
    pub rank: i64,
    pub value: u32,
}

/// Maps each sorted-order rank back to the identifier of the document occupying it.
///
/// Ranks are all a range query yields, so the client keeps this directory next to its keys; it is never sent to the server.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RankDirectory {
    documents: Vec<String>,
}

impl RankDirectory {
    pub fn new(documents: Vec<String>) -> RankDirectory {
        RankDirectory { documents }
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn document(&self, rank: usize) -> Option<&str> {
        self.documents.get(rank).map(String::as_str)
    }

    /// Identifiers of the documents selected by a query answer, in rank order.
    pub fn resolve(&self, answer: &BitVector) -> Result<Vec<&str>, DsseError> {
        if answer.len() != self.len() {
            return Err(DsseError::BitVectorLengthMismatch {
                lhs: answer.len(),
                rhs: self.len(),
            });
        }

        Ok(answer.iter_ones().map(|rank| self.documents[rank].as_str()).collect())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, DsseError> {
        serialization::encode_string_list(&self.documents)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<RankDirectory, DsseError> {
        serialization::decode_string_list(bytes).map(RankDirectory::new)
    }
}

/// Output of one encoding pass.
#[derive(Clone, Debug, PartialEq)]
pub struct EncodedCorpus {
    pub buckets: Vec<RankBucket>,
    pub directory: RankDirectory,
}

impl EncodedCorpus {
    pub fn token_stream(&self) -> Vec<StreamItem> {
        RankBucketEncoder::to_token_stream(&self.buckets)
    }
}

/// Converts a batch of `(document, value)` pairs over the value domain `[0, domain_size)` into rank buckets.
#[derive(Clone, Copy, Debug)]
pub struct RankBucketEncoder {
    domain_size: u32,
}

impl RankBucketEncoder {
    pub fn new(domain_size: u32) -> Result<RankBucketEncoder, DsseError> {
        if domain_size == 0 {
            return Err(DsseError::EmptyValueDomain);
        }

        Ok(RankBucketEncoder { domain_size })
    }

    #[inline(always)]
    pub const fn domain_size(&self) -> u32 {
        self.domain_size
    }

    /// Builds one bucket per domain value, present or not.
    ///
    /// Pairs are stable-sorted by value, so documents sharing a value keep their input order within their block.
    /// An empty batch yields `(0, -1)` for every value.
    ///
    /// # Returns
    ///
    /// Exactly `domain_size` buckets, or an error if some value falls outside of the domain.
    pub fn build_buckets<S: AsRef<str>>(&self, pairs: &[(S, u32)]) -> Result<Vec<RankBucket>, DsseError> {
        self.encode(pairs).map(|corpus| corpus.buckets)
    }

    /// Builds the buckets, along with the rank directory needed to turn query answers back into documents.
    pub fn encode<S: AsRef<str>>(&self, pairs: &[(S, u32)]) -> Result<EncodedCorpus, DsseError> {
        if let Some(&(_, value)) = pairs.iter().find(|(_, value)| *value >= self.domain_size) {
            return Err(DsseError::ValueOutOfDomain {
                value,
                domain_size: self.domain_size,
            });
        }

        let values = pairs.iter().map(|(_, value)| *value).collect::<Vec<u32>>();
        let order = rank_bucket::sort_into_rank_order(&values);

        let sorted_values = order.iter().map(|&idx| values[idx]).collect::<Vec<u32>>();
        let documents = order.iter().map(|&idx| pairs[idx].0.as_ref().to_owned()).collect::<Vec<String>>();

        let buckets = rank_bucket::build_from_sorted(&sorted_values, self.domain_size);
        trace!(corpus_len = pairs.len(), domain_size = self.domain_size, "Built rank buckets");

        Ok(EncodedCorpus {
            buckets,
            directory: RankDirectory::new(documents),
        })
    }

    /// Flattens buckets into `(low_rank, value), (high_rank, value)` pairs, in value order; twice as long as the domain.
    pub fn to_token_stream(buckets: &[RankBucket]) -> Vec<StreamItem> {
        buckets
            .iter()
            .enumerate()
            .flat_map(|(value, bucket)| {
                let value = value as u32;
                [
                    StreamItem {
                        rank: bucket.low_rank as i64,
                        value,
                    },
                    StreamItem {
                        rank: bucket.high_rank_on_wire(),
                        value,
                    },
                ]
            })
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::dsse_internals::params::{DEFAULT_VALUE_DOMAIN_SIZE, DEMO_VALUE_DOMAIN_SIZE};
    use test_case::test_case;

    const CORPUS: [(&str, u32); 7] = [("ID1", 22), ("ID2", 20), ("ID3", 18), ("ID4", 25), ("ID5", 30), ("ID6", 22), ("ID7", 18)];

    #[test]
    fn demo_corpus_buckets() {
        let encoder = RankBucketEncoder::new(DEMO_VALUE_DOMAIN_SIZE).unwrap();
        let buckets = encoder.build_buckets(&CORPUS).unwrap();

        assert_eq!(buckets.len(), DEMO_VALUE_DOMAIN_SIZE as usize);
        assert_eq!(buckets[18], RankBucket::present(0, 1));
        assert_eq!(buckets[19], RankBucket::absent(2));
        assert_eq!(buckets[20], RankBucket::present(2, 2));
        assert_eq!(buckets[22], RankBucket::present(3, 4));
        assert_eq!(buckets[25], RankBucket::present(5, 5));
        assert_eq!(buckets[30], RankBucket::present(6, 6));
        assert_eq!(buckets[0], RankBucket::absent(0));
        assert_eq!(buckets[99], RankBucket::absent(7));
    }

    #[test]
    fn demo_corpus_directory_follows_sorted_order() {
        let encoder = RankBucketEncoder::new(DEMO_VALUE_DOMAIN_SIZE).unwrap();
        let corpus = encoder.encode(&CORPUS).unwrap();

        let documents = (0..CORPUS.len()).map(|rank| corpus.directory.document(rank).unwrap()).collect::<Vec<_>>();
        assert_eq!(documents, vec!["ID3", "ID7", "ID2", "ID1", "ID6", "ID4", "ID5"]);
        assert_eq!(corpus.directory.document(CORPUS.len()), None);
    }

    #[test]
    fn token_stream_interleaves_low_and_high_per_value() {
        let encoder = RankBucketEncoder::new(DEMO_VALUE_DOMAIN_SIZE).unwrap();
        let stream = encoder.encode(&CORPUS).unwrap().token_stream();

        assert_eq!(stream.len(), 2 * DEMO_VALUE_DOMAIN_SIZE as usize);
        assert_eq!(&stream[36..40], &[
            StreamItem { rank: 0, value: 18 },
            StreamItem { rank: 1, value: 18 },
            StreamItem { rank: 2, value: 19 },
            StreamItem { rank: -1, value: 19 },
        ]);
        assert!(stream.chunks(2).enumerate().all(|(value, pair)| pair[0].value == value as u32 && pair[1].value == value as u32));
    }

    #[test]
    fn empty_batch_yields_sentinel_stream() {
        let encoder = RankBucketEncoder::new(DEFAULT_VALUE_DOMAIN_SIZE).unwrap();
        let corpus = encoder.encode::<&str>(&[]).unwrap();

        assert!(corpus.directory.is_empty());
        assert!(corpus.buckets.iter().all(|bucket| *bucket == RankBucket::absent(0)));
        assert!(corpus.token_stream().chunks(2).all(|pair| pair[0].rank == 0 && pair[1].rank == RankBucket::SENTINEL));
    }

    #[test_case(0 => matches Err(DsseError::EmptyValueDomain); "Empty domain")]
    #[test_case(1 => matches Ok(_); "Single value domain")]
    fn encoder_domain_validation(domain_size: u32) -> Result<RankBucketEncoder, DsseError> {
        RankBucketEncoder::new(domain_size)
    }

    #[test]
    fn out_of_domain_value_is_rejected() {
        let encoder = RankBucketEncoder::new(30).unwrap();
        assert_eq!(encoder.build_buckets(&CORPUS), Err(DsseError::ValueOutOfDomain { value: 30, domain_size: 30 }));
    }

    #[test]
    fn directory_resolves_answers_and_survives_serialization() {
        let encoder = RankBucketEncoder::new(DEMO_VALUE_DOMAIN_SIZE).unwrap();
        let directory = encoder.encode(&CORPUS).unwrap().directory;

        let restored = RankDirectory::from_bytes(&directory.to_bytes().unwrap()).unwrap();
        assert_eq!(restored, directory);

        let answer = BitVector::equal_range(2, 4, CORPUS.len());
        assert_eq!(restored.resolve(&answer), Ok(vec!["ID2", "ID1", "ID6"]));
        assert_eq!(
            restored.resolve(&BitVector::empty(3)),
            Err(DsseError::BitVectorLengthMismatch { lhs: 3, rhs: CORPUS.len() })
        );
    }
}
