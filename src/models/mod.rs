//! Data models

pub mod company;
pub mod outcome;

pub use company::*;
pub use outcome::*;
