//! # svcwatch-domain
//!
//! Pure domain model for watching operating-system service lifecycle changes.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, system error codes
//! - Define **service names** (the key every subscription is registered under)
//! - Define **status-change kinds** and the **notify mask** built from them
//! - Define the **dispatch predicate** deciding which raw notifications reach user code
//! - Define **notifications** (timestamped records of a delivered change)
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or OS bindings.
//! The OS boundary is expressed as a trait in the `app` crate (ports).

pub mod error;
pub mod id;

pub mod notification;
pub mod notify;
pub mod service;
