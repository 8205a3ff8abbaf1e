//! Caller identity.
//!
//! Tokens are issued by the surrounding system's authentication service;
//! this server only validates them.

pub mod jwt;
