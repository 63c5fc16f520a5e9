use std::{error::Error, fmt::Display};

#[derive(Debug, PartialEq)]
pub enum DsseError {
    // Storage
    StorageOpen(String),
    StorageWrite(String),
    StorageRead(String),

    // Chain
    MalformedChainLink(usize),
    InvalidRankField,
    RankOverflow(i64),

    // Bitmap
    BitVectorLengthMismatch { lhs: usize, rhs: usize },
    BitIndexOutOfBounds { index: usize, len: usize },

    // Encoder
    EmptyValueDomain,
    ValueOutOfDomain { value: u32, domain_size: u32 },

    // Query
    AbsentUpperBound(u32),
    IncompleteRankBucket { value: u32, found: usize },
    RankOutsideCorpus { rank: i64, corpus_len: usize },

    // Serialization
    RankDirectoryTooLarge(usize),
    FailedToDeserializeRankDirectory(String),
}

impl Display for DsseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StorageOpen(e) => write!(f, "Failed to open chain index store: {}", e),
            Self::StorageWrite(e) => write!(f, "Failed to write chain link to store: {}", e),
            Self::StorageRead(e) => write!(f, "Failed to read chain link from store: {}", e),

            Self::MalformedChainLink(len) => write!(f, "Stored chain link is {} bytes long, expected a fixed-size link.", len),
            Self::InvalidRankField => write!(f, "Rank field is not a NUL-padded decimal integer."),
            Self::RankOverflow(rank) => write!(f, "Rank {} does not fit into the fixed-width rank field.", rank),

            Self::BitVectorLengthMismatch { lhs, rhs } => write!(f, "Can not combine bit vectors of length {} and {}.", lhs, rhs),
            Self::BitIndexOutOfBounds { index, len } => write!(f, "Bit index {} is out of bounds for bit vector of length {}.", index, len),

            Self::EmptyValueDomain => write!(f, "Value domain must hold at least one value."),
            Self::ValueOutOfDomain { value, domain_size } => write!(f, "Value {} is outside of the value domain [0, {}).", value, domain_size),

            Self::AbsentUpperBound(value) => write!(f, "No document holds value {}, can't build its equality block.", value),
            Self::IncompleteRankBucket { value, found } => {
                write!(f, "Search for value {} returned {} rank(s), a rank bucket needs at least two.", value, found)
            }
            Self::RankOutsideCorpus { rank, corpus_len } => write!(f, "Rank {} is outside of a corpus holding {} documents.", rank, corpus_len),

            Self::RankDirectoryTooLarge(len) => write!(f, "Length {} doesn't fit in a rank directory's 32-bit length prefix.", len),
            Self::FailedToDeserializeRankDirectory(e) => write!(f, "Rank directory deserialization failed with: {}", e),
        }
    }
}

impl Error for DsseError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        None
    }
}
