//! Bubble domain model.
//!
//! # Responsibility
//! - Define the bubble record persisted per workspace.
//! - Carry the mutable, non-structural fields used by create/move requests.
//!
//! # Invariants
//! - `path_depth == path.depth()` for every persisted bubble.
//! - `(workspace_id, path)` is unique.

use crate::model::path::BubblePath;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque workspace identifier owned by an external collaborator.
pub type WorkspaceId = Uuid;

/// Storage-assigned bubble identifier.
pub type BubbleId = i64;

/// Rectangle of a bubble on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BubbleGeometry {
    pub top: f64,
    /// Serialized as `left` to match client payloads.
    #[serde(rename = "left")]
    pub leftmost: f64,
    pub width: f64,
    pub height: f64,
}

/// Persisted bubble record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bubble {
    pub id: BubbleId,
    pub workspace_id: WorkspaceId,
    pub name: String,
    pub path: BubblePath,
    pub path_depth: u32,
    #[serde(flatten)]
    pub geometry: BubbleGeometry,
    /// Presentation-only collapsible flag.
    pub bubblized: bool,
    pub visible: bool,
}

impl Bubble {
    /// Replaces every non-structural field from `attributes`.
    pub fn apply(&mut self, attributes: &BubbleAttributes) {
        self.name = attributes.name.clone();
        self.geometry = attributes.geometry;
        self.bubblized = attributes.bubblized;
        self.visible = attributes.visible;
    }
}

/// Non-structural bubble fields supplied by create and move requests.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BubbleAttributes {
    pub name: String,
    #[serde(flatten)]
    pub geometry: BubbleGeometry,
    #[serde(default)]
    pub bubblized: bool,
    #[serde(default)]
    pub visible: bool,
}

/// Insert model for a new bubble. Depth is derived by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBubble {
    pub workspace_id: WorkspaceId,
    pub path: BubblePath,
    pub attributes: BubbleAttributes,
}
