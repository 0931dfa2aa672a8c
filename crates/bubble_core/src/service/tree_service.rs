//! Depth-bounded bubble tree builder.
//!
//! # Responsibility
//! - Assemble `{name, children}` views of a workspace's bubble tree.
//! - Resolve the "whole workspace" (`/`) and "max depth" (`-1`) defaults.
//!
//! # Invariants
//! - Traversal is level-order with an explicit depth budget; call-stack use
//!   does not grow with tree depth.
//! - A node with no remaining budget has `children == None`; a node with
//!   budget but no children has `Some(vec![])`.
//! - Children keep store order (ascending id); roots keep fetch order.

use crate::model::bubble::{Bubble, WorkspaceId};
use crate::model::path::{BubblePath, PathError};
use crate::repo::bubble_repo::{BubbleRepoError, BubbleRepository};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Path selector meaning "every root bubble of the workspace".
pub const WORKSPACE_ROOT_SELECTOR: &str = "/";
/// Depth selector meaning "the deepest bubble's depth".
pub const MAX_DEPTH_SELECTOR: i32 = -1;

/// One node of a bubble tree view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BubbleTreeNode {
    pub name: String,
    pub children: Option<Vec<BubbleTreeNode>>,
}

impl BubbleTreeNode {
    pub fn leaf(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: None,
        }
    }
}

/// Errors from tree building.
#[derive(Debug)]
pub enum TreeServiceError {
    /// Depth below [`MAX_DEPTH_SELECTOR`].
    InvalidDepth(i32),
    /// Max-depth resolution found no bubbles.
    EmptyWorkspace(WorkspaceId),
    InvalidPath(PathError),
    BubbleNotFound {
        workspace_id: WorkspaceId,
        path: String,
    },
    /// Stored tree shape contradicts the path model.
    IntegrityViolation(String),
    Repo(BubbleRepoError),
}

impl Display for TreeServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidDepth(depth) => write!(f, "inappropriate tree depth: {depth}"),
            Self::EmptyWorkspace(id) => write!(f, "workspace {id} has no bubbles"),
            Self::InvalidPath(err) => write!(f, "{err}"),
            Self::BubbleNotFound { workspace_id, path } => {
                write!(f, "bubble not found: `{path}` in workspace {workspace_id}")
            }
            Self::IntegrityViolation(message) => {
                write!(f, "bubble tree integrity violation: {message}")
            }
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for TreeServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidPath(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<PathError> for TreeServiceError {
    fn from(value: PathError) -> Self {
        Self::InvalidPath(value)
    }
}

impl From<BubbleRepoError> for TreeServiceError {
    fn from(value: BubbleRepoError) -> Self {
        match value {
            BubbleRepoError::BubbleNotFound { workspace_id, path } => {
                Self::BubbleNotFound { workspace_id, path }
            }
            other => Self::Repo(other),
        }
    }
}

/// Tree view service facade.
pub struct TreeService<R: BubbleRepository> {
    repo: R,
}

impl<R: BubbleRepository> TreeService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Builds the forest for `path` with `depth` child levels.
    ///
    /// `path == "/"` yields one tree per root bubble; any other path yields a
    /// one-element forest. `depth == -1` resolves to the workspace max depth.
    pub fn build_forest(
        &self,
        workspace_id: WorkspaceId,
        path: &str,
        depth: i32,
    ) -> Result<Vec<BubbleTreeNode>, TreeServiceError> {
        let depth = self.resolve_depth(workspace_id, depth)?;

        if path == WORKSPACE_ROOT_SELECTOR {
            let roots = self.repo.find_by_depth(workspace_id, 1)?;
            debug!(
                "event=tree_build module=service status=start roots={} depth={depth}",
                roots.len()
            );
            return roots
                .iter()
                .map(|root| self.build_tree(root, depth))
                .collect();
        }

        let path = BubblePath::parse(path)?;
        let root = self.repo.find_by_path(workspace_id, &path)?;
        Ok(vec![self.build_tree(&root, depth)?])
    }

    /// Builds one tree rooted at `root`, expanding `depth` levels of children.
    pub fn build_tree(&self, root: &Bubble, depth: u32) -> Result<BubbleTreeNode, TreeServiceError> {
        struct Slot {
            name: String,
            children: Option<Vec<usize>>,
        }

        let mut slots = vec![Slot {
            name: root.name.clone(),
            children: None,
        }];
        let mut queue = VecDeque::from([(0usize, root.clone(), depth)]);

        while let Some((index, bubble, remaining)) = queue.pop_front() {
            if remaining == 0 {
                continue;
            }
            let children = self.repo.find_children(bubble.workspace_id, &bubble.path)?;
            let mut child_indices = Vec::with_capacity(children.len());
            for child in children {
                if child.path_depth != bubble.path_depth + 1 {
                    return Err(TreeServiceError::IntegrityViolation(format!(
                        "bubble {} at depth {} listed as child of bubble {} at depth {}",
                        child.id, child.path_depth, bubble.id, bubble.path_depth
                    )));
                }
                slots.push(Slot {
                    name: child.name.clone(),
                    children: None,
                });
                let child_index = slots.len() - 1;
                child_indices.push(child_index);
                queue.push_back((child_index, child, remaining - 1));
            }
            slots[index].children = Some(child_indices);
        }

        // Children always sit after their parent, so a reverse sweep sees
        // every child built before its parent.
        let mut built: Vec<Option<BubbleTreeNode>> = (0..slots.len()).map(|_| None).collect();
        for (index, slot) in slots.into_iter().enumerate().rev() {
            let children = slot.children.map(|indices| {
                indices
                    .into_iter()
                    .filter_map(|child| built[child].take())
                    .collect()
            });
            built[index] = Some(BubbleTreeNode {
                name: slot.name,
                children,
            });
        }

        Ok(built
            .into_iter()
            .next()
            .flatten()
            .unwrap_or_else(|| BubbleTreeNode::leaf(root.name.clone())))
    }

    fn resolve_depth(&self, workspace_id: WorkspaceId, depth: i32) -> Result<u32, TreeServiceError> {
        if depth < MAX_DEPTH_SELECTOR {
            return Err(TreeServiceError::InvalidDepth(depth));
        }
        if depth == MAX_DEPTH_SELECTOR {
            return self
                .repo
                .max_depth(workspace_id)?
                .map(|deepest| deepest.path_depth)
                .ok_or(TreeServiceError::EmptyWorkspace(workspace_id));
        }
        Ok(depth as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::{BubbleTreeNode, TreeService, TreeServiceError};
    use crate::model::bubble::{Bubble, BubbleAttributes, BubbleGeometry, NewBubble, WorkspaceId};
    use crate::model::path::BubblePath;
    use crate::repo::bubble_repo::{BubbleRepoResult, BubbleRepository};
    use uuid::Uuid;

    struct FixedRepo {
        bubbles: Vec<Bubble>,
    }

    impl BubbleRepository for FixedRepo {
        fn get_by_path(
            &self,
            _workspace_id: WorkspaceId,
            path: &BubblePath,
        ) -> BubbleRepoResult<Option<Bubble>> {
            Ok(self.bubbles.iter().find(|b| &b.path == path).cloned())
        }

        fn find_children(
            &self,
            _workspace_id: WorkspaceId,
            parent: &BubblePath,
        ) -> BubbleRepoResult<Vec<Bubble>> {
            Ok(self
                .bubbles
                .iter()
                .filter(|b| b.path.parent().as_ref() == Some(parent))
                .cloned()
                .collect())
        }

        fn find_by_depth(
            &self,
            _workspace_id: WorkspaceId,
            depth: u32,
        ) -> BubbleRepoResult<Vec<Bubble>> {
            Ok(self
                .bubbles
                .iter()
                .filter(|b| b.path_depth == depth)
                .cloned()
                .collect())
        }

        fn max_depth(&self, _workspace_id: WorkspaceId) -> BubbleRepoResult<Option<Bubble>> {
            Ok(self.bubbles.iter().max_by_key(|b| b.path_depth).cloned())
        }

        fn find_subtree(
            &self,
            _workspace_id: WorkspaceId,
            _root: &BubblePath,
            _levels: u32,
        ) -> BubbleRepoResult<Vec<Bubble>> {
            unimplemented!()
        }

        fn create_bubble(&self, _bubble: &NewBubble) -> BubbleRepoResult<Bubble> {
            unimplemented!()
        }

        fn update_bubble(&self, _bubble: &Bubble) -> BubbleRepoResult<()> {
            unimplemented!()
        }

        fn delete_subtree(
            &self,
            _workspace_id: WorkspaceId,
            _root: &BubblePath,
        ) -> BubbleRepoResult<usize> {
            unimplemented!()
        }

        fn move_subtree(
            &self,
            _workspace_id: WorkspaceId,
            _old_path: &BubblePath,
            _new_path: &BubblePath,
            _attributes: &BubbleAttributes,
        ) -> BubbleRepoResult<Bubble> {
            unimplemented!()
        }
    }

    fn bubble(id: i64, path: &str, path_depth: u32) -> Bubble {
        let path = BubblePath::parse(path).unwrap();
        Bubble {
            id,
            workspace_id: Uuid::nil(),
            name: path.leaf_name().to_string(),
            path,
            path_depth,
            geometry: BubbleGeometry::default(),
            bubblized: false,
            visible: true,
        }
    }

    #[test]
    fn builds_nested_nodes_in_store_order() {
        let service = TreeService::new(FixedRepo {
            bubbles: vec![
                bubble(1, "/r", 1),
                bubble(2, "/r/a", 2),
                bubble(3, "/r/b", 2),
                bubble(4, "/r/a/x", 3),
            ],
        });

        let tree = service.build_tree(&bubble(1, "/r", 1), 5).unwrap();
        let names: Vec<&str> = tree
            .children
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|child| child.name.as_str())
            .collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(
            tree.children.unwrap()[0].children,
            Some(vec![BubbleTreeNode {
                name: "x".to_string(),
                children: Some(vec![]),
            }])
        );
    }

    #[test]
    fn child_depth_mismatch_is_integrity_violation() {
        let service = TreeService::new(FixedRepo {
            bubbles: vec![bubble(1, "/r", 1), bubble(2, "/r/a", 4)],
        });

        let err = service.build_tree(&bubble(1, "/r", 1), 1).unwrap_err();
        assert!(matches!(err, TreeServiceError::IntegrityViolation(_)));
    }

    #[test]
    fn max_depth_resolution_uses_deepest_bubble() {
        let service = TreeService::new(FixedRepo {
            bubbles: vec![bubble(1, "/r", 1), bubble(2, "/r/a", 2)],
        });

        let forest = service.build_forest(Uuid::nil(), "/r", -1).unwrap();
        assert_eq!(forest[0].children.as_ref().map(Vec::len), Some(1));
        assert_eq!(
            forest[0].children.as_ref().unwrap()[0].children,
            Some(vec![])
        );
    }
}
