//! Domain layer - port definitions
//!
//! This module defines the traits that sit between the driver's sequencing
//! logic and the outside world, following hexagonal architecture principles.

pub mod ports;

pub use ports::*;
