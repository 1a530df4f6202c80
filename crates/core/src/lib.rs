#![forbid(unsafe_code)]

pub mod error;
pub mod model;
pub mod prompt;
pub mod protocol;
pub mod tracker;

pub use error::Error;
pub use tracker::{GradeApplied, apply_grade};
