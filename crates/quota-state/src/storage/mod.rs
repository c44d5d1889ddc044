//! Storage backends for enforcer state.

mod memory;
mod traits;

pub use memory::InMemoryStateStore;
pub use traits::{StateStore, Version, Versioned};
