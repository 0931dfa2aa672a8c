//! Bubble tree use-case service.
//!
//! # Responsibility
//! - Validate raw request paths/depths before they reach the store.
//! - Provide create, list, delete-subtree and move/rename operations.
//!
//! # Invariants
//! - Malformed paths are rejected, never corrected.
//! - Move leaves `path`/`path_depth` untouched when no new path is given.
//! - Move does not check that the new parent exists or that the new path is
//!   free; the store's uniqueness constraint is the only guard.

use crate::model::bubble::{Bubble, BubbleAttributes, NewBubble, WorkspaceId};
use crate::model::path::{BubblePath, PathError};
use crate::repo::bubble_repo::{BubbleRepoError, BubbleRepository};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Smallest accepted depth for subtree listing.
pub const LIST_DEPTH_MIN: i32 = 1;
/// Largest accepted depth for subtree listing.
pub const LIST_DEPTH_MAX: i32 = 5;

/// Errors from bubble service operations.
#[derive(Debug)]
pub enum BubbleServiceError {
    InvalidPath(PathError),
    InvalidDepth(i32),
    BubbleNotFound {
        workspace_id: WorkspaceId,
        path: String,
    },
    AlreadyExists {
        workspace_id: WorkspaceId,
        path: String,
    },
    NoParent {
        workspace_id: WorkspaceId,
        parent_path: String,
    },
    Repo(BubbleRepoError),
}

impl Display for BubbleServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidPath(err) => write!(f, "{err}"),
            Self::InvalidDepth(depth) => write!(
                f,
                "depth {depth} is outside {LIST_DEPTH_MIN}..={LIST_DEPTH_MAX}"
            ),
            Self::BubbleNotFound { workspace_id, path } => {
                write!(f, "bubble not found: `{path}` in workspace {workspace_id}")
            }
            Self::AlreadyExists { workspace_id, path } => {
                write!(f, "bubble already exists: `{path}` in workspace {workspace_id}")
            }
            Self::NoParent {
                workspace_id,
                parent_path,
            } => write!(
                f,
                "parent bubble `{parent_path}` does not exist in workspace {workspace_id}"
            ),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for BubbleServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidPath(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<PathError> for BubbleServiceError {
    fn from(value: PathError) -> Self {
        Self::InvalidPath(value)
    }
}

impl From<BubbleRepoError> for BubbleServiceError {
    fn from(value: BubbleRepoError) -> Self {
        match value {
            BubbleRepoError::BubbleNotFound { workspace_id, path } => {
                Self::BubbleNotFound { workspace_id, path }
            }
            BubbleRepoError::AlreadyExists { workspace_id, path } => {
                Self::AlreadyExists { workspace_id, path }
            }
            BubbleRepoError::NoParent {
                workspace_id,
                parent_path,
            } => Self::NoParent {
                workspace_id,
                parent_path,
            },
            other => Self::Repo(other),
        }
    }
}

/// Bubble tree service facade.
pub struct BubbleService<R: BubbleRepository> {
    repo: R,
}

impl<R: BubbleRepository> BubbleService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    /// Resolves the bubble at `path`.
    pub fn find_by_path(
        &self,
        workspace_id: WorkspaceId,
        path: &str,
    ) -> Result<Bubble, BubbleServiceError> {
        let path = BubblePath::parse(path)?;
        self.repo
            .find_by_path(workspace_id, &path)
            .map_err(Into::into)
    }

    /// Creates one bubble at `path`.
    ///
    /// Roots get depth 1; other bubbles need an existing parent and get the
    /// parent's depth plus one.
    pub fn create_bubble(
        &self,
        workspace_id: WorkspaceId,
        path: &str,
        attributes: BubbleAttributes,
    ) -> Result<Bubble, BubbleServiceError> {
        let path = BubblePath::parse(path)?;
        let bubble = self.repo.create_bubble(&NewBubble {
            workspace_id,
            path,
            attributes,
        })?;
        info!(
            "event=bubble_create module=service status=ok bubble_id={} depth={}",
            bubble.id, bubble.path_depth
        );
        Ok(bubble)
    }

    /// Lists the bubble at `path` and its descendants up to `depth` levels,
    /// where `depth == 1` is the bubble alone.
    pub fn list_bubbles(
        &self,
        workspace_id: WorkspaceId,
        path: &str,
        depth: i32,
    ) -> Result<Vec<Bubble>, BubbleServiceError> {
        if !(LIST_DEPTH_MIN..=LIST_DEPTH_MAX).contains(&depth) {
            return Err(BubbleServiceError::InvalidDepth(depth));
        }
        let path = BubblePath::parse(path)?;
        self.repo
            .find_subtree(workspace_id, &path, depth as u32)
            .map_err(Into::into)
    }

    /// Deletes the bubble at `path`, its descendants and their curves.
    ///
    /// Deleting a missing path succeeds and changes nothing.
    pub fn delete_subtree(
        &self,
        workspace_id: WorkspaceId,
        path: &str,
    ) -> Result<usize, BubbleServiceError> {
        let path = BubblePath::parse(path)?;
        let removed = self.repo.delete_subtree(workspace_id, &path)?;
        info!(
            "event=bubble_delete module=service status=ok depth={} removed={removed}",
            path.depth()
        );
        Ok(removed)
    }

    /// Updates the bubble at `old_path`, moving its whole subtree when
    /// `new_path` is given and non-empty.
    pub fn move_bubble(
        &self,
        workspace_id: WorkspaceId,
        old_path: &str,
        new_path: Option<&str>,
        attributes: &BubbleAttributes,
    ) -> Result<Bubble, BubbleServiceError> {
        let old_path = BubblePath::parse(old_path)?;

        match new_path.filter(|value| !value.is_empty()) {
            None => {
                let mut bubble = self.repo.find_by_path(workspace_id, &old_path)?;
                bubble.apply(attributes);
                self.repo.update_bubble(&bubble)?;
                Ok(bubble)
            }
            Some(new_path) => {
                let new_path = BubblePath::parse(new_path)?;
                self.repo
                    .move_subtree(workspace_id, &old_path, &new_path, attributes)
                    .map_err(Into::into)
            }
        }
    }
}
