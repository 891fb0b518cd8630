pub mod client;
pub mod import;
pub mod types;

#[cfg(test)]
pub(crate) mod fake;

pub use client::*;
pub use import::*;
pub use types::*;
