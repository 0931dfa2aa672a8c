//! Use-case boundary for bubble workspaces.
//!
//! Transport layers call [`BubbleApi`] and ship the returned
//! [`ApiResponse`] envelopes as they see fit.

pub mod api;
pub mod response;

pub use api::{
    core_version, init_logging, ping, BubbleApi, BubbleResponse, CreateBubbleRequest,
    CurveResponse, MoveBubbleRequest, UpdateCurvesRequest,
};
pub use response::{ApiResponse, ResponseCode};
