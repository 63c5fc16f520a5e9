pub const BIT_SECURITY_LEVEL: usize = 128;

pub const STATE_TOKEN_BYTE_LEN: usize = BIT_SECURITY_LEVEL / 8;
pub const LINK_KEY_BYTE_LEN: usize = BIT_SECURITY_LEVEL / 8;
pub const MASTER_KEY_BYTE_LEN: usize = (2 * BIT_SECURITY_LEVEL) / 8;
pub const KEYWORD_TOKEN_BYTE_LEN: usize = (2 * BIT_SECURITY_LEVEL) / 8;
pub const INDEX_LABEL_BYTE_LEN: usize = (2 * BIT_SECURITY_LEVEL) / 8;

pub const RANK_FIELD_BYTE_LEN: usize = 15;
pub const OPCODE_BYTE_LEN: usize = 1;
pub const CHAIN_LINK_BYTE_LEN: usize = RANK_FIELD_BYTE_LEN + OPCODE_BYTE_LEN + LINK_KEY_BYTE_LEN;

pub const BITS_PER_BLOCK: usize = u64::BITS as usize;
pub const PARALLEL_BLOCK_THRESHOLD: usize = 1 << 12;

pub const DEMO_VALUE_DOMAIN_SIZE: u32 = 100;
pub const DEFAULT_VALUE_DOMAIN_SIZE: u32 = 10_000;

pub const STORE_FILE_NAME: &str = "chain_index.redb";
