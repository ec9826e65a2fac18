//! Network transport: newline-delimited JSON over TCP

pub mod server;

pub use server::{serve, start};
