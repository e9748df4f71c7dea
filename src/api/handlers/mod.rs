//! API request handlers.

/// Health check handler.
pub mod health;
/// Research run handlers: start, status, events, stream, report, narrative.
pub mod research;
