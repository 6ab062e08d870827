//! Integration tests for Social-Sync
//!
//! These tests use wiremock to stand in for the content API, the embedding
//! endpoint and the vector index, and drive fetches and full sync runs
//! end-to-end.

mod common;
mod fetch_tests;
mod sync_tests;
