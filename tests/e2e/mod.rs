//! End-to-end tests for registry-gateway.
//!
//! Lookups run through the public [`registry_gateway::Gateway`] facade
//! against scripted in-process registries, and against a local JSON-RPC
//! server for the HTTP transport.

mod harness;
mod integration_tests;
