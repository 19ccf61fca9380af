#![allow(clippy::doc_markdown)] // Allow technical terms like ON24, gRPC in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # ON24 Cog
//!
//! A gRPC plugin ("Cog") that lets an automation host discover and run steps against
//! ON24 event registrants: create, forget, discover, and assert on a field.
//!
//! ## Overview
//!
//! The host owns the process and drives it through three RPCs:
//!
//! - `GetManifest` describes the Cog, its auth fields and its steps
//! - `RunStep` runs one step in a fresh call-scope
//! - `RunSteps` runs a stream of steps in one call-scope, in order
//!
//! ## Module Organization
//!
//! - [`operators`] - Comparison operators and yes/no boolean normalization
//! - [`step`] - Step contract: descriptors, typed input access, outcomes
//! - [`client`] - ON24 REST client and the capability facade handed to steps
//! - [`steps`] - The registrant step handlers and the step registry
//! - [`cog`] - Dispatcher implementing `CogService`
//! - [`grpc`] - Server bootstrap and lifecycle
//! - [`proto`] - Generated wire types and domain conversions
//! - [`config`] - Layered configuration
//! - [`error`] - Structured error handling
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use on24_cog::config::CogConfig;
//! use on24_cog::grpc::GrpcServer;
//! use on24_cog::Cog;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CogConfig::load(None)?;
//! let cog = Cog::from_config(&config)?;
//! GrpcServer::new(config.server, cog).serve().await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod cog;
pub mod config;
pub mod error;
pub mod grpc;
pub mod logging;
pub mod operators;
pub mod proto;
pub mod step;
pub mod steps;

#[cfg(test)]
mod test_support;

pub use cog::{CallScope, Cog};
pub use error::{CogError, Result};
pub use step::{CogStep, Outcome, StepDescriptor, StepInvocation, StepOutcome};
pub use steps::StepRegistry;
