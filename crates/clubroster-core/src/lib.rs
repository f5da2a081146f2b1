//! Domain model and access-control resolver for the clubroster backend.
//!
//! This crate is deliberately free of I/O: the resolver in [`access`] is a
//! pure function over a [`principal::Principal`], an action, and the
//! ownership facts the storage layer derives at request time. Everything
//! here is unit-testable without a database or HTTP stack.

pub mod access;
pub mod model;
pub mod principal;
