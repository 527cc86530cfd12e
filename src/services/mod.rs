//! Service layer
//!
//! `SimpleServices` is built once at startup and hands out the shared
//! components every command works with:
//! - the single `DiskCache` instance
//! - the LRCLIB client and the resolver built on top of it

pub mod simple_container;

pub use simple_container::SimpleServices;
