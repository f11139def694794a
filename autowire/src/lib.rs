//! Application bootstrap based on [autowire_di] dependency injection.
//!
//! Applications which rely on dependency injection still need an entrypoint which reads
//! configuration, sets up logging and creates the context. This crate provides such entrypoint in
//! the form of [Application](application::Application), configured by
//! [ApplicationConfig](config::ApplicationConfig).
//!
//! ### Features
//!
//! * `threadsafe` - use threadsafe pointers and `Send + Sync` trait bounds

pub mod application;
pub mod config;
