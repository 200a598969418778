pub mod demo;
pub mod error;
pub mod model;
pub mod program;
pub mod report;
pub mod solver;

pub use error::*;
pub use model::*;
pub use report::*;
pub use solver::*;
