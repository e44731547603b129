//! Quotation API transports.
//!
//! This module contains:
//! - The `QuoteTransport` trait the client calls for every outbound request
//! - The Twelve Data HTTP implementation
//!
//! Transports only move bytes. Rate limiting, caching, and parsing happen in
//! the client and the parser, so a transport can be swapped for a scripted
//! one without changing any policy.

mod traits;

pub mod twelve_data;

pub use traits::QuoteTransport;
pub use twelve_data::TwelveDataTransport;
