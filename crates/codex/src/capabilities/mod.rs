mod cache;
mod guard;
mod snapshot;
mod types;

pub use cache::*;
pub use guard::*;
pub use snapshot::*;
pub use types::*;
