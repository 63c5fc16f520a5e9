use super::params::STATE_TOKEN_BYTE_LEN;

/// One encrypted entry appended to the index: `index_label -> state_label`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpdateToken {
    pub index_label: Vec<u8>,
    pub state_label: Vec<u8>,
}

/// Everything the server needs to walk one keyword's chain: the keyword token, the newest state token and the number of links to visit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchToken {
    pub keyword: Vec<u8>,
    pub state_token: [u8; STATE_TOKEN_BYTE_LEN],
    pub chain_length: u64,
}
