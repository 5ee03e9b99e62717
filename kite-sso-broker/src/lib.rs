//! DiscourseConnect SSO provider backed by Kite Connect.
//!
//! A forum sends its users here with a signed `sso` payload. They log in on
//! Kite, come back with a one-time request token, and are returned to the
//! forum with a freshly signed payload describing their Kite identity.

pub mod config;
pub mod envelope;
pub mod error;
pub mod form;
pub mod handshake;
pub mod kite;
pub mod provider;
pub mod signature;
pub mod web;
