// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! The native API the rest of the crate is written against.
//!
//! at the moment we only ship the headless backend

mod headless;

pub use headless::*;
