//! Common utilities and types shared across duocall components.

#![warn(clippy::pedantic)]

/// Module for common error types
pub mod error;

/// Module for the generic key-value repository contract
pub mod repository;
