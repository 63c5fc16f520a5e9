//! RangeDSSE: A Rust library implementation of forward-private **D**ynamic **S**earchable **S**ymmetric **E**ncryption, with encrypted range queries over rank buckets.
//!
//! This crate lets a client outsource an encrypted keyword index to an untrusted server, and later ask the server for the ranks
//! currently linked to a keyword, without the server learning the keyword. Updates are forward-private: a search token handed
//! out today can't be used to locate links appended tomorrow. On top of that index, numeric range predicates are answered by
//! storing one rank bucket per value of a small, fixed value domain and combining at most two buckets into a bit vector.
//!
//! ## Features
//!
//! * **Chain Index:** Each keyword owns a chain of encrypted links, addressed by `SHA-256(keyword ‖ state)` and masked with TurboSHAKE128. The server walks a chain backwards from the newest state token, using per-link AES-128 keys.
//! * **Rank Buckets:** Documents are sorted by value once; each value is then summarised by `(low_rank, high_rank)`, the first and last ranks its documents occupy, or `(low_rank, -1)` when no document holds it.
//! * **Predicate Engine:** `<`, `<=`, `==`, `>=`, `>` and closed intervals are evaluated as bitwise algebra over rank-indexed bit vectors, block-parallel for large corpora.
//! * **Pluggable Storage:** The server persists chain links in a `redb` file by default, and can run against any [`IndexBackend`].
//!
//! ## Usage
//!
//! The client side owns the master key, the per-keyword chain states and the rank directory; only update tokens and search tokens cross to the server.
//!
//! Add RangeDSSE as dependency to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! range_dsse = "=0.1.0"
//! rand = "=0.9.0"
//! rand_chacha = "=0.9.0"
//! ```
//!
//! Then, you can use it in your code:
//!
//! ```rust
//! use range_dsse::{
//!     DEMO_VALUE_DOMAIN_SIZE, MASTER_KEY_BYTE_LEN, MemoryBackend,
//!     client::{ChainBucketSource, Client},
//!     encoder::RankBucketEncoder,
//!     query::{Predicate, PredicateEngine},
//!     server::Server,
//! };
//! use rand::prelude::*;
//! use rand_chacha::ChaCha8Rng;
//!
//! fn main() {
//!     // Example corpus (replace with your own)
//!     let corpus = [("ID1", 22), ("ID2", 20), ("ID3", 18), ("ID4", 25), ("ID5", 30), ("ID6", 22), ("ID7", 18)];
//!
//!     // Client encodes its corpus into rank buckets, keeping the rank directory for itself
//!     let encoder = RankBucketEncoder::new(DEMO_VALUE_DOMAIN_SIZE).expect("Value domain must not be empty");
//!     let encoded = encoder.encode(&corpus).expect("Every value must lie within the domain");
//!
//!     let mut rng = ChaCha8Rng::from_os_rng();
//!     let mut master_key = [0u8; MASTER_KEY_BYTE_LEN]; // You'll want to keep this key secret and durable
//!     rng.fill_bytes(&mut master_key);
//!
//!     let mut client = Client::setup(&master_key);
//!     let tokens = client.encode_token_stream(&encoded.token_stream()).expect("Failed to build update tokens");
//!
//!     // Server persists update tokens, use `Server::setup` for an on-disk store
//!     let server = Server::with_backend(MemoryBackend::new());
//!     server.update_batch(&tokens).expect("Server failed to persist update tokens");
//!
//!     // Client asks for every document valued within [18, 22]
//!     let source = ChainBucketSource::new(&client, &server, encoded.directory.len());
//!     let engine = PredicateEngine::new(encoded.directory.len(), DEMO_VALUE_DOMAIN_SIZE);
//!
//!     let answer = engine.evaluate(&source, Predicate::Between(18, 22)).expect("Failed to evaluate range predicate");
//!     let documents = encoded.directory.resolve(&answer).expect("Answer must cover the whole corpus");
//!
//!     assert_eq!(documents, vec!["ID3", "ID7", "ID2", "ID1", "ID6"]);
//! }
//! ```
//!
//! ## Modules
//!
//! * `client`: Contains the `Client` struct, which builds update and search tokens, and `ChainBucketSource`, which fetches rank buckets through chain searches.
//! * `server`: Contains the `Server` struct, which persists update tokens and walks chains on behalf of search tokens.
//! * `encoder`: Contains the `RankBucketEncoder`, turning `(document, value)` pairs into rank buckets, a token stream and a rank directory.
//! * `query`: Contains the `PredicateEngine`, answering range predicates as bit vectors over document ranks.

pub use dsse_internals::bitmap::BitVector;
pub use dsse_internals::chain::{DocumentRank, Opcode};
pub use dsse_internals::error::DsseError;
pub use dsse_internals::params::{DEFAULT_VALUE_DOMAIN_SIZE, DEMO_VALUE_DOMAIN_SIZE, MASTER_KEY_BYTE_LEN, STATE_TOKEN_BYTE_LEN, STORE_FILE_NAME};
pub use dsse_internals::rank_bucket::RankBucket;
pub use dsse_internals::store::{IndexBackend, MemoryBackend, RedbBackend};
pub use dsse_internals::token::{SearchToken, UpdateToken};
pub mod client;
pub mod encoder;
pub mod query;
pub mod server;

mod dsse_internals;

mod test_dsse;
