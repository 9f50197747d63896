// src/lib.rs

//! fxcal: economic-calendar fetcher with a token-driven selection flow.

pub mod collaborators;
pub mod conversation;
pub mod error;
pub mod models;
pub mod render;
pub mod services;
