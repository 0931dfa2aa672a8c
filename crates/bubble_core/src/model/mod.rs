//! Domain model for workspace bubble trees and their curves.
//!
//! # Responsibility
//! - Define the value types shared by repositories and services.
//! - Keep pure derivation logic (paths, codec, move planning) free of I/O.
//!
//! # Invariants
//! - A bubble's ancestry is encoded only in its materialized path.
//! - Curve geometry is stored only as an encoded control point sequence.

pub mod bubble;
pub mod control_point;
pub mod curve;
pub mod path;
pub mod relocation;
