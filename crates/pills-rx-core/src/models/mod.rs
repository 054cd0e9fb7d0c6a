//! Domain models for the pills-rx system.

mod adherence;
mod dose;
mod drug;
mod prescription;

pub use adherence::*;
pub use dose::*;
pub use drug::*;
pub use prescription::*;
