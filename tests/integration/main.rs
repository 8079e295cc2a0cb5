//! Integration tests for Offer Tracker
//!
//! These tests use wiremock to serve marketplace search pages and exercise
//! paginated crawls and full sweeps end-to-end.

mod common;
mod crawl_tests;
mod sweep_tests;
