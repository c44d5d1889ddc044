//! API request handlers

mod admission;
mod enforcers;
mod health;

pub use admission::*;
pub use enforcers::*;
pub use health::*;
