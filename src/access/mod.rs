//! Role and permission gating.
//!
//! Decides per request whether a piece of UI (or an endpoint) is shown to the viewer. The viewer
//! is resolved from an ordered chain of providers; the decision itself is a pure function of the
//! resolved user and the gate's requirements.

pub mod gate;
pub mod permissions;
pub mod provider;

pub use gate::{DenyReason, GateVerdict, RoleGate, conditional_render};
pub use permissions::{has_permission, permission_table, permissions_for, primary_role};
pub use provider::{
    ContextProvider, KeyValueStore, MemoryStore, ProviderChain, StorageProvider,
    USER_STORAGE_KEYS, UserProvider,
};
