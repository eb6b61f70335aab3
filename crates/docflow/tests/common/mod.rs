//! Shared test utilities for docflow integration tests.
//!
//! This module provides:
//! - `FakeJobApi`, a scripted in-memory job service
//! - Builders for wire types
//! - `TestServer`, an in-process HTTP job service for client tests

#![allow(dead_code)]

pub mod fake;
pub mod server;

pub use builders::*;
pub use fake::{Call, FakeJobApi};
pub use server::TestServer;
