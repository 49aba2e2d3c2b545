//! lna-test-server library
//!
//! HTTP fixture for manually testing a browser's Local Network Access
//! restrictions: every GET and POST gets a canned JSON envelope with
//! permissive CORS headers, every OPTIONS a bare preflight reply.

pub mod access_log;
pub mod config;
pub mod envelope;
pub mod error;
pub mod handler;
pub mod http_api;
pub mod launcher;
