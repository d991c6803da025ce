// src/lib.rs
// wafaq - FAQ suggestion bridge in front of a hosted conversational assistant

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod assistant;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod http;
pub mod resolver;
pub mod selection;
pub mod session;
pub mod utils;
pub mod web;

pub use error::{Result, WafaqError};
