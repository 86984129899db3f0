//! Synthetic insurance claims pipeline.
//!
//! Three stages land linked raw streams in an object store:
//! policies, first notices of loss (FNOL), and claims. Every field is
//! run through deliberate defect injection on the way out.

pub mod claims_generator;
pub mod clock;
pub mod config;
pub mod defects;
pub mod engine;
pub mod error;
pub mod fnol_generator;
pub mod ids;
pub mod notification;
pub mod policy_generator;
pub mod records;
pub mod rng;
pub mod stage;
pub mod store;
pub mod types;
pub mod vocabulary;
