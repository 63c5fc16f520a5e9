use crate::dsse_internals::{
    chain::{ChainLink, ChainWalk, DocumentRank},
    crypto,
    error::DsseError,
    store::{IndexBackend, RedbBackend},
    token::{SearchToken, UpdateToken},
};
use std::{
    path::Path,
    sync::atomic::{AtomicU64, Ordering},
};
use tracing::{debug, trace, warn};

/// Represents the server side of the forward-private DSSE scheme, i.e. the chain index store.
///
/// The server never holds a live keyword index. It keeps an append-only map of encrypted chain links and rebuilds a keyword's
/// current rank set on demand, by walking that keyword's chain backwards from the state token supplied by the client.
pub struct Server<B: IndexBackend = RedbBackend> {
    backend: B,
    missing_links: AtomicU64,
}

impl Server<RedbBackend> {
    /// Opens, creating it if absent, the persistent chain index store rooted at directory `path`.
    ///
    /// Failing to open the store is fatal for the caller: there is no retry, since a misconfigured path isn't transient.
    /// The store file is locked for the lifetime of the returned server, so a second `setup` on the same `path` fails
    /// with [`DsseError::StorageOpen`] until the first server is dropped.
    pub fn setup<P: AsRef<Path>>(path: P) -> Result<Server<RedbBackend>, DsseError> {
        RedbBackend::open(path.as_ref()).map(Server::with_backend)
    }
}

impl<B: IndexBackend> Server<B> {
    pub fn with_backend(backend: B) -> Server<B> {
        Server {
            backend,
            missing_links: AtomicU64::new(0),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Number of chain links which were absent from the store while searching, over this server's lifetime.
    pub fn missing_link_count(&self) -> u64 {
        self.missing_links.load(Ordering::Relaxed)
    }

    /// Persists one update token, as `index_label -> state_label`, unconditionally.
    ///
    /// Index labels are derived from a monotonically advancing state token, so each call writes a fresh key.
    /// Updates to the same keyword must be serialized by the caller, as the chain relies on its state tokens advancing in order.
    pub fn update(&self, token: &UpdateToken) -> Result<(), DsseError> {
        self.backend.put(&token.index_label, &token.state_label)?;

        debug!(label_len = token.index_label.len(), "Appended chain link");
        Ok(())
    }

    /// Persists a stream of update tokens in one write, e.g. the full output of an encoding pass.
    pub fn update_batch(&self, tokens: &[UpdateToken]) -> Result<(), DsseError> {
        let entries = tokens
            .iter()
            .map(|token| (token.index_label.as_slice(), token.state_label.as_slice()))
            .collect::<Vec<_>>();
        self.backend.put_batch(&entries)?;

        debug!(count = tokens.len(), "Appended chain links in batch");
        Ok(())
    }

    /// Walks a keyword's chain backwards, reconstructing the ranks currently associated with it.
    ///
    /// For each of the `chain_length` steps, newest link first:
    /// 1. **Lookup:** Computes the link's index label `SHA-256(keyword ‖ state_token)` and reads it from the store.
    ///    A missing link is tolerated, it is unmasked from an all-zero payload instead of aborting the walk, and counted.
    /// 2. **Unmasking:** XORs the stored payload with `TurboSHAKE128(keyword ‖ state_token)`, recovering `rank ‖ opcode ‖ link key`.
    /// 3. **Set semantics:** A deletion is buffered; an insertion is emitted unless it cancels a buffered deletion of the same rank.
    /// 4. **Chain step:** Decrypts the current state token with the link key, yielding the state token of the next older link.
    ///
    /// # Returns
    ///
    /// Confirmed ranks in the order they were discovered. Storage read errors and malformed stored links are returned as is.
    pub fn search(&self, token: &SearchToken) -> Result<Vec<DocumentRank>, DsseError> {
        let (walk, _) = (1..=token.chain_length)
            .rev()
            .try_fold((ChainWalk::new(), token.state_token), |(walk, state_token), step| {
                let index_label = crypto::index_label(&token.keyword, &state_token);
                let stored = self.backend.get(&index_label)?;

                if stored.is_none() {
                    self.missing_links.fetch_add(1, Ordering::Relaxed);
                    warn!(step, chain_length = token.chain_length, "Chain link missing, treating it as an empty payload");
                }

                let link = ChainLink::open(stored.as_deref(), &token.keyword, &state_token)?;
                trace!(step, opcode = ?link.opcode, "Walked chain link");

                let previous_state_token = link.previous_state_token(&state_token);
                Ok::<_, DsseError>((walk.step(&link), previous_state_token))
            })?;

        debug!(
            chain_length = token.chain_length,
            found = walk.confirmed().len(),
            dangling_deletes = walk.pending_deletes().len(),
            "Searched chain"
        );

        Ok(walk.into_confirmed())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        client::Client,
        dsse_internals::{chain::Opcode, params::MASTER_KEY_BYTE_LEN, store::MemoryBackend},
    };
    use rand::prelude::*;
    use rand_chacha::ChaCha20Rng;

    fn client() -> Client {
        Client::from_rng(&[0x2au8; MASTER_KEY_BYTE_LEN], ChaCha20Rng::seed_from_u64(7))
    }

    fn rank(rank: i64) -> DocumentRank {
        DocumentRank::from_i64(rank).unwrap()
    }

    #[test]
    fn search_of_empty_chain_finds_nothing() {
        let server = Server::with_backend(MemoryBackend::new());
        let token = SearchToken {
            keyword: vec![1, 2, 3],
            state_token: [0u8; 16],
            chain_length: 0,
        };

        assert_eq!(server.search(&token), Ok(vec![]));
        assert_eq!(server.missing_link_count(), 0);
    }

    #[test]
    fn update_writes_exactly_one_entry() {
        let mut client = client();
        let server = Server::with_backend(MemoryBackend::new());

        let token = client.update(b"20", rank(2), Opcode::Insert);
        server.update(&token).unwrap();

        assert_eq!(server.backend().len(), 1);
        assert_eq!(server.backend().get(&token.index_label), Ok(Some(token.state_label.clone())));
    }

    #[test]
    fn search_returns_newest_link_first() {
        let mut client = client();
        let server = Server::with_backend(MemoryBackend::new());

        for r in [3, 4] {
            server.update(&client.update(b"22", rank(r), Opcode::Insert)).unwrap();
        }

        let token = client.search_token(b"22").unwrap();
        assert_eq!(token.chain_length, 2);
        assert_eq!(server.search(&token), Ok(vec![rank(4), rank(3)]));
    }

    #[test]
    fn batched_updates_are_searchable() {
        let mut client = client();
        let server = Server::with_backend(MemoryBackend::new());

        let tokens = (0..10).map(|r| client.update(b"7", rank(r), Opcode::Insert)).collect::<Vec<_>>();
        server.update_batch(&tokens).unwrap();

        let found = server.search(&client.search_token(b"7").unwrap()).unwrap();
        assert_eq!(found, (0..10).rev().map(rank).collect::<Vec<_>>());
    }

    #[test]
    fn missing_link_is_tolerated_and_counted() {
        let mut client = client();
        let server = Server::with_backend(MemoryBackend::new());

        let tokens = [1, 2, 3].map(|r| client.update(b"18", rank(r), Opcode::Insert));
        tokens.iter().for_each(|token| server.update(token).unwrap());

        // Dropping the oldest link leaves the newer ones intact; the walk reaches it last.
        server.backend().remove(&tokens[0].index_label);

        let found = server.search(&client.search_token(b"18").unwrap()).unwrap();
        assert_eq!(&found[..2], &[rank(3), rank(2)]);
        assert_eq!(server.missing_link_count(), 1);
    }

    #[test]
    fn chain_longer_than_written_is_not_fatal() {
        let mut client = client();
        let server = Server::with_backend(MemoryBackend::new());

        server.update(&client.update(b"30", rank(6), Opcode::Insert)).unwrap();

        let mut token = client.search_token(b"30").unwrap();
        token.chain_length = 4;

        let found = server.search(&token).unwrap();
        assert_eq!(found.first(), Some(&rank(6)));
        assert_eq!(server.missing_link_count(), 3);
    }

    #[test]
    fn malformed_stored_link_is_reported() {
        let mut client = client();
        let server = Server::with_backend(MemoryBackend::new());

        let mut token = client.update(b"25", rank(5), Opcode::Insert);
        token.state_label.truncate(20);
        server.update(&token).unwrap();

        assert_eq!(server.search(&client.search_token(b"25").unwrap()), Err(DsseError::MalformedChainLink(20)));
    }

    #[test]
    fn setup_fails_on_unusable_path() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(matches!(Server::setup(file.path()), Err(DsseError::StorageOpen(_))));
    }

    #[test]
    fn store_is_locked_while_a_server_holds_it() {
        let dir = tempfile::tempdir().unwrap();

        let first = Server::setup(dir.path()).unwrap();
        assert!(matches!(Server::setup(dir.path()), Err(DsseError::StorageOpen(_))));

        drop(first);
        assert!(Server::setup(dir.path()).is_ok());
    }
}
