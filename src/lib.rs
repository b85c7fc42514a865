//! Pure-Rust OPC UA client/server core runtime.
//!
//! The runtime is built around a small number of long-lived worker threads,
//! each driving one cooperative event dispatcher: timer expiries, socket
//! readiness and cross-manager notifications all translate into enqueued
//! events. On top of that sit the OPC UA binary value model, the client
//! session state machine, the server service adapters and the streaming
//! UANodeSet loader that bootstraps the address space.

pub mod address_space;
pub mod binary;
pub mod client;
pub mod collections;
pub mod config;
mod error;
pub mod event;
pub mod server;
mod service;
pub mod transport;
pub mod ua;

pub use self::{
    error::{Error, Result},
    service::{ServiceRequest, ServiceResponse},
};
