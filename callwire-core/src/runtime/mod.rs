//! Runtime layer.
//!
//! The [`Client`] sits between operation declarations and the transport:
//! it assembles the transport stack and the factory lists once, then hands
//! out cached call plans.

pub mod client;

pub use client::{Client, ClientBuilder};
