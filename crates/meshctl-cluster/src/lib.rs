//! meshctl-cluster
//!
//! The cluster side of an install: the object model, manifest
//! (de)serialization, and the `ClusterClient` trait with its in-memory and
//! directory-backed implementations.

pub mod client;
pub mod error;
pub mod kubeconfig;
pub mod local;
pub mod manifest;
pub mod memory;
pub mod object;

pub use crate::client::{BoxFuture, ClusterClient};
pub use crate::error::ClusterError;
pub use crate::kubeconfig::{connect, ConnectionDescriptor};
pub use crate::local::LocalCluster;
pub use crate::manifest::Manifest;
pub use crate::memory::{MemoryCluster, Mutation};
pub use crate::object::{ClusterObject, ObjectKey, ObjectMeta};
