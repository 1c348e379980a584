//! turtlescan: daily turtle-style trend signals over a US equity universe.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`]. The [`cli`] module wires them
//! into the `turtlescan` binary.

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
pub mod logging;
