//! pixie-to-curl library crate.
//!
//! Turns HTTP exchanges traced by Pixie into replayable curl commands: a PxL
//! script selects the traffic, a backend streams the rows back, and each row
//! is rebuilt into a request and rendered as one shell-safe command line.
//!
//! The stable, supported API surface is exposed via [`crate::api`] and
//! [`crate::prelude`]. Other modules back the CLI and may change more often.

pub mod api;
pub mod prelude;

pub mod backend;
pub mod cli;
pub mod commands;
pub mod config;
pub mod convert;
pub mod curl;
pub mod error;
pub mod query;
pub mod record;
pub mod router;
pub mod stream;
