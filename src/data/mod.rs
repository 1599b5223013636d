//! Measurement data: the embedded reference table and pseudo-experiments.

pub mod reference;
pub mod toys;

pub use reference::*;
pub use toys::*;
