//! HTTP handlers

pub mod health;
pub mod fetch;
pub mod companies;
