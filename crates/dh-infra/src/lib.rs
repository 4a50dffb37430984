//! # dh-infra
//!
//! Storage-side implementations of the deskhelper ports: the file-backed
//! configuration channel and an in-memory channel for tests.

pub mod channel;

pub use channel::{FileChannelRepository, InMemoryChannel};
