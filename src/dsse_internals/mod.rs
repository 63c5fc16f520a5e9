pub mod bitmap;
pub mod chain;
pub mod crypto;
pub mod error;
pub mod params;
pub mod rank_bucket;
pub mod serialization;
pub mod store;
pub mod token;
