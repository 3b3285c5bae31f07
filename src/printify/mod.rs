pub mod client;
pub mod guard;
#[cfg(test)]
pub mod mock;
pub mod payloads;

pub use client::{PrintProvider, PrintifyClient, PrintifyError};
pub use guard::Guarded;
