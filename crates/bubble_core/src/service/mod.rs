//! Service layer for bubble and curve use-cases.

pub mod bubble_service;
pub mod curve_service;
pub mod tree_service;
