//! Command implementations for the `vista` binary.

pub mod annotate;
pub mod config;
pub mod index;
pub mod inspect;
pub mod models;
pub mod search;
mod setup;
mod theme;
mod types;
