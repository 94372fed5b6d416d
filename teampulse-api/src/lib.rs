//! # TeamPulse API Server Library
//!
//! HTTP layer of TeamPulse: a multi-tenant team, project and task service.
//! Domain logic and persistence live in `teampulse-shared`.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Environment configuration
//! - `error`: Error handling and HTTP response mapping
//! - `middleware`: Security headers and team context resolution
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
