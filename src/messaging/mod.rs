//! Message construction and ordered publication.
//!
//! - `payload` - JSON message parsing and validation
//! - `ordered` - Per-topic sequence registry and ordered publisher

pub mod ordered;
pub mod payload;

pub use ordered::*;
pub use payload::*;
