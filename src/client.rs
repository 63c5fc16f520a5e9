use crate::{
    dsse_internals::{
        chain::{ChainLink, DocumentRank, Opcode},
        crypto,
        error::DsseError,
        params::{LINK_KEY_BYTE_LEN, MASTER_KEY_BYTE_LEN, STATE_TOKEN_BYTE_LEN},
        rank_bucket::RankBucket,
        store::IndexBackend,
        token::{SearchToken, UpdateToken},
    },
    encoder::StreamItem,
    query::BucketSource,
    server::Server,
};
use rand::prelude::*;
use rand_chacha::ChaCha20Rng;
use std::collections::HashMap;

struct KeywordState {
    state_token: [u8; STATE_TOKEN_BYTE_LEN],
    chain_length: u64,
}

/// Reference token builder for the client side of the scheme.
///
/// Keeps, per keyword, the newest state token and the number of links written so far. Each update advances the state token
/// by encrypting it under a fresh link key, so tokens handed out by earlier searches can't be used to find later links.
pub struct Client {
    master_key: [u8; MASTER_KEY_BYTE_LEN],
    rng: ChaCha20Rng,
    states: HashMap<Vec<u8>, KeywordState>,
}

impl Client {
    pub fn setup(master_key: &[u8; MASTER_KEY_BYTE_LEN]) -> Client {
        Client::from_rng(master_key, ChaCha20Rng::from_os_rng())
    }

    pub fn from_rng(master_key: &[u8; MASTER_KEY_BYTE_LEN], rng: ChaCha20Rng) -> Client {
        Client {
            master_key: *master_key,
            rng,
            states: HashMap::new(),
        }
    }

    /// Builds the update token appending `(rank, opcode)` to `keyword`'s chain, and advances the keyword's state.
    ///
    /// The first update of a keyword draws a random initial state token, which never gets a link of its own.
    pub fn update(&mut self, keyword: &[u8], rank: DocumentRank, opcode: Opcode) -> UpdateToken {
        let keyword_token = crypto::keyword_token(&self.master_key, keyword);

        let (state_token, chain_length) = match self.states.get(keyword) {
            Some(state) => (state.state_token, state.chain_length),
            None => {
                let mut initial = [0u8; STATE_TOKEN_BYTE_LEN];
                self.rng.fill_bytes(&mut initial);
                (initial, 0)
            }
        };

        let mut link_key = [0u8; LINK_KEY_BYTE_LEN];
        self.rng.fill_bytes(&mut link_key);

        let next_state_token = crypto::encrypt_state_token(&link_key, &state_token);
        let link = ChainLink::new(rank, opcode, link_key);

        let token = UpdateToken {
            index_label: crypto::index_label(&keyword_token, &next_state_token).to_vec(),
            state_label: link.seal(&keyword_token, &next_state_token).to_vec(),
        };

        self.states.insert(
            keyword.to_vec(),
            KeywordState {
                state_token: next_state_token,
                chain_length: chain_length + 1,
            },
        );

        token
    }

    /// Same as [`Client::update`], keyed on the decimal form of a domain value.
    pub fn update_value(&mut self, value: u32, rank: i64, opcode: Opcode) -> Result<UpdateToken, DsseError> {
        let rank = DocumentRank::from_i64(rank)?;
        Ok(self.update(value_keyword(value).as_bytes(), rank, opcode))
    }

    /// Turns an encoder token stream into update tokens, one insertion per `(rank, value)` item, in stream order.
    pub fn encode_token_stream(&mut self, stream: &[StreamItem]) -> Result<Vec<UpdateToken>, DsseError> {
        stream.iter().map(|item| self.update_value(item.value, item.rank, Opcode::Insert)).collect()
    }

    /// Search token for `keyword`, or `None` if the keyword was never updated.
    pub fn search_token(&self, keyword: &[u8]) -> Option<SearchToken> {
        self.states.get(keyword).map(|state| SearchToken {
            keyword: crypto::keyword_token(&self.master_key, keyword).to_vec(),
            state_token: state.state_token,
            chain_length: state.chain_length,
        })
    }

    pub fn search_token_for_value(&self, value: u32) -> Option<SearchToken> {
        self.search_token(value_keyword(value).as_bytes())
    }

    pub fn chain_length(&self, keyword: &[u8]) -> u64 {
        self.states.get(keyword).map_or(0, |state| state.chain_length)
    }
}

#[inline]
fn value_keyword(value: u32) -> String {
    value.to_string()
}

/// Fetches rank buckets by running one chain search per domain value, against a server, on behalf of a client.
pub struct ChainBucketSource<'a, B: IndexBackend> {
    client: &'a Client,
    server: &'a Server<B>,
    corpus_len: usize,
}

impl<'a, B: IndexBackend> ChainBucketSource<'a, B> {
    pub fn new(client: &'a Client, server: &'a Server<B>, corpus_len: usize) -> ChainBucketSource<'a, B> {
        ChainBucketSource { client, server, corpus_len }
    }
}

impl<B: IndexBackend> BucketSource for ChainBucketSource<'_, B> {
    fn bucket(&self, value: u32) -> Result<Option<RankBucket>, DsseError> {
        let Some(token) = self.client.search_token_for_value(value) else {
            return Ok(None);
        };

        let ranks = self.server.search(&token)?;
        if ranks.is_empty() {
            return Ok(None);
        }

        RankBucket::from_search_result(value, &ranks, self.corpus_len).map(Some)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::dsse_internals::store::MemoryBackend;

    fn client() -> Client {
        Client::from_rng(&[1u8; MASTER_KEY_BYTE_LEN], ChaCha20Rng::seed_from_u64(42))
    }

    #[test]
    fn unknown_keyword_has_no_search_token() {
        let client = client();

        assert_eq!(client.search_token(b"18"), None);
        assert_eq!(client.chain_length(b"18"), 0);
    }

    #[test]
    fn every_update_rotates_state_and_label() {
        let mut client = client();

        let first = client.update_value(18, 0, Opcode::Insert).unwrap();
        let token_after_first = client.search_token_for_value(18).unwrap();

        let second = client.update_value(18, 1, Opcode::Insert).unwrap();
        let token_after_second = client.search_token_for_value(18).unwrap();

        assert_ne!(first.index_label, second.index_label);
        assert_ne!(token_after_first.state_token, token_after_second.state_token);
        assert_eq!(token_after_first.keyword, token_after_second.keyword);
        assert_eq!(token_after_second.chain_length, 2);
    }

    #[test]
    fn keywords_have_independent_chains() {
        let mut client = client();

        client.update_value(18, 0, Opcode::Insert).unwrap();
        client.update_value(18, 1, Opcode::Insert).unwrap();
        client.update_value(20, 2, Opcode::Insert).unwrap();

        assert_eq!(client.chain_length(b"18"), 2);
        assert_eq!(client.chain_length(b"20"), 1);
        assert_ne!(client.search_token_for_value(18).unwrap().keyword, client.search_token_for_value(20).unwrap().keyword);
    }

    #[test]
    fn update_value_rejects_rank_wider_than_field() {
        let mut client = client();
        assert_eq!(client.update_value(1, i64::MAX, Opcode::Insert), Err(DsseError::RankOverflow(i64::MAX)));
    }

    #[test]
    fn chain_bucket_source_reads_back_encoded_bucket() {
        let mut client = client();
        let server = Server::with_backend(MemoryBackend::new());

        let stream = [
            StreamItem { rank: 3, value: 22 },
            StreamItem { rank: 4, value: 22 },
            StreamItem { rank: 5, value: 23 },
            StreamItem { rank: -1, value: 23 },
        ];
        server.update_batch(&client.encode_token_stream(&stream).unwrap()).unwrap();

        let source = ChainBucketSource::new(&client, &server, 7);
        assert_eq!(source.bucket(22), Ok(Some(RankBucket::present(3, 4))));
        assert_eq!(source.bucket(23), Ok(Some(RankBucket::absent(5))));
        assert_eq!(source.bucket(24), Ok(None));
    }
}
