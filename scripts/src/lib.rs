//! Scripts for deploying and initializing the PoolTogether smart contracts.

#![deny(missing_docs)]

pub mod cli;
pub mod commands;
pub mod constants;
pub mod errors;
pub mod steps;
pub mod types;
pub mod utils;
