pub mod schedule;
pub mod storage;

pub use schedule::*;
pub use storage::*;
