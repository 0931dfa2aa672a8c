//! Subtree move planning.
//!
//! # Responsibility
//! - Turn a snapshot of a moving subtree into concrete path/depth rewrites.
//!
//! # Invariants
//! - The plan is computed from the snapshot only; rewritten rows are never
//!   revisited.
//! - Rewrites are ordered deepest-first, so applying them one by one never
//!   collides with a row of the same subtree that has not moved yet.
//! - Every planned `path_depth` equals the depth of its planned path.

use crate::model::bubble::{Bubble, BubbleId};
use crate::model::path::BubblePath;

/// New address for one bubble.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathRewrite {
    pub bubble_id: BubbleId,
    pub path: BubblePath,
    pub path_depth: u32,
}

/// Plans the rewrites of every strict descendant of `old_root`.
///
/// Snapshot rows outside `old_root` (or equal to it) are ignored; the moving
/// bubble itself is written separately by the caller.
pub fn plan_descendant_rewrites(
    snapshot: &[Bubble],
    old_root: &BubblePath,
    new_root: &BubblePath,
) -> Vec<PathRewrite> {
    let mut plan: Vec<PathRewrite> = snapshot
        .iter()
        .filter(|bubble| bubble.path != *old_root)
        .filter_map(|bubble| {
            bubble.path.rebase(old_root, new_root).map(|path| PathRewrite {
                bubble_id: bubble.id,
                path_depth: path.depth(),
                path,
            })
        })
        .collect();

    plan.sort_by(|left, right| {
        right
            .path_depth
            .cmp(&left.path_depth)
            .then_with(|| left.bubble_id.cmp(&right.bubble_id))
    });
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::bubble::BubbleGeometry;
    use uuid::Uuid;

    fn bubble(id: BubbleId, path: &str) -> Bubble {
        let path = BubblePath::parse(path).unwrap();
        Bubble {
            id,
            workspace_id: Uuid::nil(),
            name: path.leaf_name().to_string(),
            path_depth: path.depth(),
            path,
            geometry: BubbleGeometry::default(),
            bubblized: false,
            visible: true,
        }
    }

    fn path(value: &str) -> BubblePath {
        BubblePath::parse(value).unwrap()
    }

    #[test]
    fn plans_only_strict_descendants() {
        let snapshot = vec![
            bubble(1, "/a/b"),
            bubble(2, "/a/b/c"),
            bubble(3, "/a/b/d"),
            bubble(4, "/a/bc"),
        ];

        let plan = plan_descendant_rewrites(&snapshot, &path("/a/b"), &path("/a/x"));
        let targets: Vec<_> = plan
            .iter()
            .map(|item| (item.bubble_id, item.path.as_str()))
            .collect();
        assert_eq!(targets, vec![(2, "/a/x/c"), (3, "/a/x/d")]);
    }

    #[test]
    fn recomputes_depth_when_moving_up() {
        let snapshot = vec![bubble(2, "/a/b/c"), bubble(3, "/a/b/c/d")];

        let plan = plan_descendant_rewrites(&snapshot, &path("/a/b"), &path("/z"));
        for item in &plan {
            assert_eq!(item.path_depth, item.path.depth());
        }
        assert_eq!(plan[0].path.as_str(), "/z/c/d");
        assert_eq!(plan[0].path_depth, 3);
        assert_eq!(plan[1].path.as_str(), "/z/c");
        assert_eq!(plan[1].path_depth, 2);
    }

    #[test]
    fn deepest_rows_are_rewritten_first() {
        let snapshot = vec![
            bubble(10, "/a/b"),
            bubble(11, "/a/b/b"),
            bubble(12, "/a/b/b/b"),
        ];

        // Moving `/a` under itself: each new path is an existing, deeper old path.
        let plan = plan_descendant_rewrites(&snapshot, &path("/a"), &path("/a/b"));
        let order: Vec<_> = plan.iter().map(|item| item.bubble_id).collect();
        assert_eq!(order, vec![12, 11, 10]);
    }
}
