//! HTTP surface of the chat relay.
//!
//! Serves the chat page and relays posted conversations through
//! [`fitchat_core::Relay`]. Routes can be assembled individually with
//! [`http::chat_routes`] and [`http::page_routes`], or all at once with
//! [`http::router`].

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

pub mod config;
pub mod http;

pub use config::ServerArgs;
pub use http::AppState;
