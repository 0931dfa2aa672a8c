//! Bubble workspace use-case API.
//!
//! # Responsibility
//! - Expose one call per workspace endpoint over a migrated connection.
//! - Translate core errors into stable [`ResponseCode`]s.
//!
//! # Invariants
//! - Calls never panic; every failure becomes an [`ApiResponse`].
//! - Storage failures surface as `INTERNAL_ERROR`, never as a semantic code.

use crate::response::{ApiResponse, ResponseCode};
use bubble_core::service::tree_service::{MAX_DEPTH_SELECTOR, WORKSPACE_ROOT_SELECTOR};
use bubble_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    BatchResult, BatchStatus, Bubble, BubbleAttributes, BubbleRepoError, BubbleService,
    BubbleServiceError, BubbleTreeNode, CodecError, ControlPoint, Curve, CurveBatch, CurveId,
    CurveRepoError, CurveService, PenConfig, SqliteBubbleRepository, SqliteCurveRepository,
    TreeService, TreeServiceError, WorkspaceId,
};
use log::{debug, error};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use uuid::Uuid;

/// Minimal health-check API for transport smoke integration.
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Exposes the core crate version.
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes core logging once per process.
///
/// Returns an empty string on success and the error message otherwise.
pub fn init_logging(level: &str, log_dir: &str) -> String {
    match init_logging_inner(level, log_dir) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Create-bubble request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateBubbleRequest {
    pub path: String,
    #[serde(flatten)]
    pub attributes: BubbleAttributes,
}

/// Move/update-bubble request body.
///
/// A missing or empty `new_path` updates the bubble in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveBubbleRequest {
    pub old_path: String,
    #[serde(default)]
    pub new_path: Option<String>,
    #[serde(flatten)]
    pub attributes: BubbleAttributes,
}

/// Update-curves request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateCurvesRequest {
    pub path: String,
    #[serde(flatten)]
    pub batch: CurveBatch,
}

/// Curve as returned to clients, with decoded control points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveResponse {
    pub id: CurveId,
    pub config: PenConfig,
    pub position: Vec<ControlPoint>,
}

impl TryFrom<&Curve> for CurveResponse {
    type Error = CodecError;

    fn try_from(curve: &Curve) -> Result<Self, Self::Error> {
        Ok(Self {
            id: curve.id,
            config: PenConfig {
                color: curve.color.clone(),
                thickness: curve.thickness,
            },
            position: curve.points()?,
        })
    }
}

/// Bubble fields plus the curves it owns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BubbleResponse {
    #[serde(flatten)]
    pub bubble: Bubble,
    pub curves: Vec<CurveResponse>,
}

/// Use-case API bound to one migrated connection.
pub struct BubbleApi<'conn> {
    conn: &'conn Connection,
}

impl<'conn> BubbleApi<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Lists the bubble at `path` and its descendants, `depth` levels deep
    /// (`1..=5`), each with its curves.
    pub fn list_bubbles(
        &self,
        workspace_id: &str,
        path: &str,
        depth: i32,
    ) -> ApiResponse<Vec<BubbleResponse>> {
        run("list_bubbles", || {
            let workspace_id = parse_workspace_id(workspace_id)?;
            let bubbles = self
                .bubble_service()?
                .list_bubbles(workspace_id, path, depth)?;
            let curves = self.curve_service()?;
            bubbles
                .into_iter()
                .map(|bubble| with_curves(&curves, bubble))
                .collect()
        })
    }

    /// Deletes the subtree at `path`. Data is the removed bubble count.
    pub fn delete_bubbles(&self, workspace_id: &str, path: &str) -> ApiResponse<usize> {
        run("delete_bubbles", || {
            let workspace_id = parse_workspace_id(workspace_id)?;
            Ok(self.bubble_service()?.delete_subtree(workspace_id, path)?)
        })
    }

    /// Builds the `{name, children}` forest.
    ///
    /// `path` defaults to every root, `depth` to the workspace max depth.
    pub fn get_bubble_tree(
        &self,
        workspace_id: &str,
        path: Option<&str>,
        depth: Option<i32>,
    ) -> ApiResponse<Vec<BubbleTreeNode>> {
        run("get_bubble_tree", || {
            let workspace_id = parse_workspace_id(workspace_id)?;
            let repo = SqliteBubbleRepository::try_new(self.conn)?;
            Ok(TreeService::new(repo).build_forest(
                workspace_id,
                path.unwrap_or(WORKSPACE_ROOT_SELECTOR),
                depth.unwrap_or(MAX_DEPTH_SELECTOR),
            )?)
        })
    }

    pub fn create_bubble(
        &self,
        workspace_id: &str,
        request: &CreateBubbleRequest,
    ) -> ApiResponse<BubbleResponse> {
        run("create_bubble", || {
            let workspace_id = parse_workspace_id(workspace_id)?;
            let bubble = self.bubble_service()?.create_bubble(
                workspace_id,
                &request.path,
                request.attributes.clone(),
            )?;
            Ok(BubbleResponse {
                bubble,
                curves: Vec::new(),
            })
        })
    }

    /// Applies a curve batch to the bubble at `request.path`.
    ///
    /// A partially applied batch returns `FAIL_EXIST` with the full
    /// per-item result.
    pub fn update_curves(
        &self,
        workspace_id: &str,
        request: &UpdateCurvesRequest,
    ) -> ApiResponse<BatchResult> {
        let response = run("update_curves", || {
            let workspace_id = parse_workspace_id(workspace_id)?;
            let bubble = self
                .bubble_service()?
                .find_by_path(workspace_id, &request.path)?;
            Ok(self.curve_service()?.apply_batch(&bubble, &request.batch))
        });

        match response.data {
            Some(result) if result.status == BatchStatus::FailExist => {
                let message = format!("{} batch item(s) failed", result.failure_count());
                ApiResponse::with_code(ResponseCode::FailExist, message, result)
            }
            _ => response,
        }
    }

    /// Updates the bubble at `request.old_path`, moving its subtree when
    /// `request.new_path` is set.
    pub fn move_bubble(
        &self,
        workspace_id: &str,
        request: &MoveBubbleRequest,
    ) -> ApiResponse<BubbleResponse> {
        run("move_bubble", || {
            let workspace_id = parse_workspace_id(workspace_id)?;
            let bubble = self.bubble_service()?.move_bubble(
                workspace_id,
                &request.old_path,
                request.new_path.as_deref(),
                &request.attributes,
            )?;
            with_curves(&self.curve_service()?, bubble)
        })
    }

    fn bubble_service(&self) -> Result<BubbleService<SqliteBubbleRepository<'conn>>, ApiFailure> {
        Ok(BubbleService::new(SqliteBubbleRepository::try_new(self.conn)?))
    }

    fn curve_service(&self) -> Result<CurveService<SqliteCurveRepository<'conn>>, ApiFailure> {
        Ok(CurveService::new(SqliteCurveRepository::try_new(self.conn)?))
    }
}

/// Failure carried from a use-case closure to its response envelope.
#[derive(Debug)]
struct ApiFailure {
    code: ResponseCode,
    message: String,
}

impl ApiFailure {
    fn new(code: ResponseCode, err: impl Display) -> Self {
        Self {
            code,
            message: err.to_string(),
        }
    }
}

impl From<BubbleServiceError> for ApiFailure {
    fn from(value: BubbleServiceError) -> Self {
        let code = match &value {
            BubbleServiceError::InvalidPath(_) => ResponseCode::BadRequest,
            BubbleServiceError::InvalidDepth(_) => ResponseCode::InappropriateDepth,
            BubbleServiceError::BubbleNotFound { .. } => ResponseCode::BubbleNotFound,
            BubbleServiceError::AlreadyExists { .. } => ResponseCode::AlreadyExist,
            BubbleServiceError::NoParent { .. } => ResponseCode::NoParent,
            BubbleServiceError::Repo(_) => ResponseCode::InternalError,
        };
        Self::new(code, value)
    }
}

impl From<TreeServiceError> for ApiFailure {
    fn from(value: TreeServiceError) -> Self {
        let code = match &value {
            TreeServiceError::InvalidDepth(_) => ResponseCode::InappropriateDepth,
            TreeServiceError::EmptyWorkspace(_) => ResponseCode::NoWorkspace,
            TreeServiceError::InvalidPath(_) => ResponseCode::BadRequest,
            TreeServiceError::BubbleNotFound { .. } => ResponseCode::BubbleNotFound,
            TreeServiceError::IntegrityViolation(_) | TreeServiceError::Repo(_) => {
                ResponseCode::InternalError
            }
        };
        Self::new(code, value)
    }
}

impl From<BubbleRepoError> for ApiFailure {
    fn from(value: BubbleRepoError) -> Self {
        Self::new(ResponseCode::InternalError, value)
    }
}

impl From<CurveRepoError> for ApiFailure {
    fn from(value: CurveRepoError) -> Self {
        Self::new(ResponseCode::InternalError, value)
    }
}

impl From<CodecError> for ApiFailure {
    fn from(value: CodecError) -> Self {
        Self::new(ResponseCode::InternalError, value)
    }
}

fn run<T>(op: &'static str, f: impl FnOnce() -> Result<T, ApiFailure>) -> ApiResponse<T> {
    match f() {
        Ok(data) => ApiResponse::ok(data),
        Err(failure) => {
            if failure.code == ResponseCode::InternalError {
                error!(
                    "event=api_call module=api status=error op={op} error_code={} error={}",
                    failure.code, failure.message
                );
            } else {
                debug!(
                    "event=api_call module=api status=rejected op={op} error_code={}",
                    failure.code
                );
            }
            ApiResponse::failure(failure.code, failure.message)
        }
    }
}

fn parse_workspace_id(raw: &str) -> Result<WorkspaceId, ApiFailure> {
    Uuid::parse_str(raw.trim()).map_err(|_| {
        ApiFailure::new(
            ResponseCode::BadRequest,
            format!("invalid workspace id `{raw}`"),
        )
    })
}

fn with_curves(
    curves: &CurveService<SqliteCurveRepository<'_>>,
    bubble: Bubble,
) -> Result<BubbleResponse, ApiFailure> {
    let curves = curves
        .list_for_bubble(&bubble)?
        .iter()
        .map(CurveResponse::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(BubbleResponse { bubble, curves })
}
