//! # Models
//!
//! The Metropolis-Hastings engine and the models it ships with: a Gaussian
//! mean/variance model and a Poisson count model with optional subject
//! random intercepts.

pub mod mh;
pub mod normal;
pub mod poisson;
