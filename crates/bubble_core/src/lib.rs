//! Core domain logic for bubble workspaces.
//! This crate is the single source of truth for bubble tree invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, CoreConfig, DatabaseConfig, LoggingConfig};
pub use db::{open_db, open_db_in_memory, open_db_with, DbError, DbResult};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::bubble::{
    Bubble, BubbleAttributes, BubbleGeometry, BubbleId, NewBubble, WorkspaceId,
};
pub use model::control_point::{CodecError, ControlPoint, ENCODED_WIDTH};
pub use model::curve::{Curve, CurveDraft, CurveId, NewCurve, PenConfig};
pub use model::path::{BubblePath, PathError};
pub use repo::bubble_repo::{
    BubbleRepoError, BubbleRepoResult, BubbleRepository, SqliteBubbleRepository,
};
pub use repo::curve_repo::{
    CurveRepoError, CurveRepoResult, CurveRepository, SqliteCurveRepository,
};
pub use service::bubble_service::{BubbleService, BubbleServiceError};
pub use service::curve_service::{
    BatchResult, BatchStatus, CurveBatch, CurveService, CurveUpdate, ItemOutcome,
};
pub use service::tree_service::{BubbleTreeNode, TreeService, TreeServiceError};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
