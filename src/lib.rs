//! Core library for a relativistic particle-in-cell plasma simulation.
//!
//! The crate is organized the way the physics flows: a stretched,
//! domain-decomposed [`grid`], Yee-staggered electromagnetic [`field`]s,
//! [`current`] densities deposited by [`species`] of macro-particles, tied
//! together by the per-step orchestration in [`pic`]. [`domain`] abstracts
//! the cross-rank communication the decomposition needs; everything else is
//! agnostic to whether that communication crosses threads or machines.

#[macro_use]
extern crate error_chain;

pub mod config;
pub mod constants;
pub mod current;
pub mod domain;
pub mod error;
pub mod field;
pub mod grid;
pub mod pic;
pub mod rng;
pub mod species;
pub mod vector;

pub use error::{Error, ErrorKind, Result};

/// Floating point precision used throughout the core. Built with the
/// `single` feature for single precision, double precision otherwise.
#[cfg(not(feature = "single"))]
pub type Float = f64;

#[cfg(feature = "single")]
pub type Float = f32;
