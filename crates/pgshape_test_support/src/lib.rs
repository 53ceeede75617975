#![allow(clippy::result_large_err)]

pub mod containers;
mod fake_connection;

pub use fake_connection::{FakeConnection, row};
