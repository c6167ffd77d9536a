//! Key to token hashing.

pub mod md5;
pub mod traits;
pub mod xxh3;

pub use self::md5::Md5Partitioner;
pub use traits::Partitioner;
pub use xxh3::Xxh3Partitioner;
