use super::{
    crypto,
    error::DsseError,
    params::{CHAIN_LINK_BYTE_LEN, LINK_KEY_BYTE_LEN, RANK_FIELD_BYTE_LEN, STATE_TOKEN_BYTE_LEN},
};
use std::fmt::Display;

const RANK_FIELD_END: usize = RANK_FIELD_BYTE_LEN;
const OPCODE_OFFSET: usize = RANK_FIELD_END;
const LINK_KEY_OFFSET: usize = OPCODE_OFFSET + 1;

/// Fixed-width rank payload carried by a chain link.
///
/// Holds a signed decimal integer, left-aligned and NUL-padded, so that the absent-value sentinel `-1` survives the trip through the index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DocumentRank([u8; RANK_FIELD_BYTE_LEN]);

impl DocumentRank {
    pub fn from_i64(rank: i64) -> Result<DocumentRank, DsseError> {
        let digits = rank.to_string();
        if digits.len() > RANK_FIELD_BYTE_LEN {
            return Err(DsseError::RankOverflow(rank));
        }

        let mut field = [0u8; RANK_FIELD_BYTE_LEN];
        field[..digits.len()].copy_from_slice(digits.as_bytes());

        Ok(DocumentRank(field))
    }

    pub const fn from_field(field: [u8; RANK_FIELD_BYTE_LEN]) -> DocumentRank {
        DocumentRank(field)
    }

    pub const fn as_field(&self) -> &[u8; RANK_FIELD_BYTE_LEN] {
        &self.0
    }

    pub fn to_i64(&self) -> Result<i64, DsseError> {
        let digits_len = self.0.iter().position(|&b| b == 0).unwrap_or(RANK_FIELD_BYTE_LEN);
        if self.0[digits_len..].iter().any(|&b| b != 0) {
            return Err(DsseError::InvalidRankField);
        }

        std::str::from_utf8(&self.0[..digits_len])
            .ok()
            .and_then(|digits| digits.parse::<i64>().ok())
            .ok_or(DsseError::InvalidRankField)
    }
}

impl Display for DocumentRank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.to_i64() {
            Ok(rank) => write!(f, "{}", rank),
            Err(_) => write!(f, "<opaque rank {:02x?}>", self.0),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Opcode {
    /// Buffered during the backward walk; cancels the nearest older insertion of the same rank.
    Delete,
    /// Emitted as a result, unless a newer deletion of the same rank is pending.
    Insert,
}

impl Opcode {
    pub const fn to_byte(self) -> u8 {
        match self {
            Self::Delete => b'0',
            Self::Insert => b'1',
        }
    }

    pub const fn from_byte(byte: u8) -> Option<Opcode> {
        match byte {
            b'0' => Some(Self::Delete),
            b'1' => Some(Self::Insert),
            _ => None,
        }
    }
}

/// Plaintext content of one chain link: `rank (15B) ‖ opcode (1B) ‖ link key (16B)`.
#[derive(Clone, Debug, PartialEq)]
pub struct ChainLink {
    pub rank: DocumentRank,
    pub opcode: Option<Opcode>,
    pub link_key: [u8; LINK_KEY_BYTE_LEN],
}

impl ChainLink {
    pub fn new(rank: DocumentRank, opcode: Opcode, link_key: [u8; LINK_KEY_BYTE_LEN]) -> ChainLink {
        ChainLink {
            rank,
            opcode: Some(opcode),
            link_key,
        }
    }

    pub fn to_payload(&self) -> [u8; CHAIN_LINK_BYTE_LEN] {
        let mut payload = [0u8; CHAIN_LINK_BYTE_LEN];

        payload[..RANK_FIELD_END].copy_from_slice(self.rank.as_field());
        payload[OPCODE_OFFSET] = self.opcode.map_or(0, Opcode::to_byte);
        payload[LINK_KEY_OFFSET..].copy_from_slice(&self.link_key);

        payload
    }

    pub fn from_payload(payload: &[u8; CHAIN_LINK_BYTE_LEN]) -> ChainLink {
        let mut rank = [0u8; RANK_FIELD_BYTE_LEN];
        let mut link_key = [0u8; LINK_KEY_BYTE_LEN];

        rank.copy_from_slice(&payload[..RANK_FIELD_END]);
        link_key.copy_from_slice(&payload[LINK_KEY_OFFSET..]);

        ChainLink {
            rank: DocumentRank::from_field(rank),
            opcode: Opcode::from_byte(payload[OPCODE_OFFSET]),
            link_key,
        }
    }

    /// Masks the link for storage, using the same keyed hash the search walk strips off.
    pub fn seal(&self, keyword: &[u8], state_token: &[u8; STATE_TOKEN_BYTE_LEN]) -> [u8; CHAIN_LINK_BYTE_LEN] {
        let mut sealed = self.to_payload();
        crypto::xor_in_place(&mut sealed, &crypto::chain_mask(keyword, state_token));
        sealed
    }

    /// Unmasks a stored link. A missing link is passed in as `None` and unmasks from an all-zero payload.
    pub fn open(stored: Option<&[u8]>, keyword: &[u8], state_token: &[u8; STATE_TOKEN_BYTE_LEN]) -> Result<ChainLink, DsseError> {
        let mut payload = [0u8; CHAIN_LINK_BYTE_LEN];

        if let Some(bytes) = stored {
            if bytes.len() != CHAIN_LINK_BYTE_LEN {
                return Err(DsseError::MalformedChainLink(bytes.len()));
            }
            payload.copy_from_slice(bytes);
        }

        crypto::xor_in_place(&mut payload, &crypto::chain_mask(keyword, state_token));
        Ok(ChainLink::from_payload(&payload))
    }

    /// State token of the next older link in the chain.
    pub fn previous_state_token(&self, state_token: &[u8; STATE_TOKEN_BYTE_LEN]) -> [u8; STATE_TOKEN_BYTE_LEN] {
        crypto::decrypt_state_token(&self.link_key, state_token)
    }
}

/// Accumulator of the backward chain walk, folded one link at a time, newest first.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChainWalk {
    confirmed: Vec<DocumentRank>,
    pending_deletes: Vec<DocumentRank>,
}

impl ChainWalk {
    pub fn new() -> ChainWalk {
        ChainWalk::default()
    }

    pub fn step(mut self, link: &ChainLink) -> ChainWalk {
        match link.opcode {
            Some(Opcode::Delete) => self.pending_deletes.push(link.rank),
            Some(Opcode::Insert) => match self.pending_deletes.iter().position(|pending| *pending == link.rank) {
                Some(idx) => {
                    self.pending_deletes.remove(idx);
                }
                None => self.confirmed.push(link.rank),
            },
            None => {}
        }

        self
    }

    pub fn confirmed(&self) -> &[DocumentRank] {
        &self.confirmed
    }

    pub fn pending_deletes(&self) -> &[DocumentRank] {
        &self.pending_deletes
    }

    pub fn into_confirmed(self) -> Vec<DocumentRank> {
        self.confirmed
    }
}
