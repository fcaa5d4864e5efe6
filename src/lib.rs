//! Ephemeris-quality force model and adaptive Gauss-Radau (IAS15-style) integrator for
//! massless test particles and their first-order variational partners.
//!
//! This crate is the numerical core only: the JPL planetary/small-body ephemeris readers, the
//! generic adaptive-step driver's surrounding CLI/container wrapper, and configuration file
//! loading are external collaborators the core consumes through the [`ephemeris`] traits and
//! the [`config::SimConfig`] value. [`session::integrate`] is the entry point a wrapper calls.

pub mod aggregator;
pub mod config;
pub mod constants;
pub mod dynamics;
pub mod ephemeris;
pub mod errors;
pub mod frame;
pub mod integrator;
pub mod particles;
pub mod recorder;
pub mod session;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use config::{NonGravConfig, ReferenceFrame, RelativityModel, SimConfig};
pub use errors::{EphemerisError, IntegratorError, IntegratorStatus, SessionError};
pub use session::{integrate, IntegratorOutcome};
