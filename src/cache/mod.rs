pub mod key;
pub mod store;

mod macros;

pub use key::CacheKey;
pub use store::{Cache, CacheStats};
