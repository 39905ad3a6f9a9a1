//! Network layer: framed line transport in, rendered lines out.
//!
//! Everything protocol-shaped stops here: the dispatch core only ever
//! sees decoded text lines and produces text lines per recipient.

mod gateway;

pub use gateway::Gateway;
