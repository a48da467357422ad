//! Command implementations for the tagwatch CLI

mod check;
mod serve;
mod watch;

pub use check::*;
pub use serve::*;
pub use watch::*;
