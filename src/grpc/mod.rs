//! gRPC server for the Cog.
//!
//! Serves `automaton.cog.CogService` and, when enabled, the standard
//! `grpc.health.v1` and reflection services next to it.
//!
//! ```bash
//! # Test with grpcurl (reflection enabled)
//! grpcurl -plaintext localhost:28866 list
//! grpcurl -plaintext localhost:28866 automaton.cog.CogService/GetManifest
//! ```

pub mod server;

pub use server::{GrpcServer, GrpcServerHandle};
