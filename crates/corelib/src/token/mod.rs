//! Ring positions.

pub mod long;
pub mod traits;

pub use long::LongToken;
pub use traits::Token;
