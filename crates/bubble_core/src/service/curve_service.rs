//! Curve batch-apply service.
//!
//! # Responsibility
//! - Apply client delete/update/create curve edits for one bubble.
//! - Report one outcome per item plus an aggregate status.
//!
//! # Invariants
//! - Items are independent: one failure never aborts or rolls back another.
//! - Deletes run first, then updates, then creates; outcomes keep input order.

use crate::model::bubble::{Bubble, BubbleId};
use crate::model::curve::{Curve, CurveDraft, CurveId, NewCurve};
use crate::repo::curve_repo::{CurveRepoError, CurveRepository};
use log::{info, warn};
use serde::{Deserialize, Serialize};

/// Replacement geometry for one existing curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveUpdate {
    pub id: CurveId,
    #[serde(flatten)]
    pub curve: CurveDraft,
}

/// Client edit set for one bubble's curves.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CurveBatch {
    #[serde(default)]
    pub delete: Vec<CurveId>,
    #[serde(default)]
    pub update: Vec<CurveUpdate>,
    #[serde(default)]
    pub create: Vec<CurveDraft>,
}

impl CurveBatch {
    pub fn is_empty(&self) -> bool {
        self.delete.is_empty() && self.update.is_empty() && self.create.is_empty()
    }
}

/// Result of one batch item.
///
/// `id` is `None` only for a create that failed before an id was assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemOutcome {
    pub id: Option<CurveId>,
    pub success: bool,
}

/// Aggregate batch status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchStatus {
    Ok,
    /// At least one item failed; the other items were still applied.
    FailExist,
}

/// Per-item outcomes grouped by operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    pub deleted: Vec<ItemOutcome>,
    pub updated: Vec<ItemOutcome>,
    pub created: Vec<ItemOutcome>,
    pub status: BatchStatus,
}

impl BatchResult {
    pub fn failure_count(&self) -> usize {
        self.outcomes().filter(|outcome| !outcome.success).count()
    }

    fn outcomes(&self) -> impl Iterator<Item = &ItemOutcome> {
        self.deleted
            .iter()
            .chain(self.updated.iter())
            .chain(self.created.iter())
    }
}

/// Curve use-case service.
pub struct CurveService<R: CurveRepository> {
    repo: R,
}

impl<R: CurveRepository> CurveService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Lists the curves owned by `bubble`, ordered by id.
    pub fn list_for_bubble(&self, bubble: &Bubble) -> Result<Vec<Curve>, CurveRepoError> {
        self.repo.list_for_bubble(bubble.id)
    }

    /// Applies `batch` to the curves of `bubble`.
    ///
    /// Callers must inspect item outcomes; `status` only says whether every
    /// item succeeded.
    pub fn apply_batch(&self, bubble: &Bubble, batch: &CurveBatch) -> BatchResult {
        let deleted: Vec<ItemOutcome> = batch
            .delete
            .iter()
            .map(|&id| outcome(Some(id), self.repo.delete_curve(id), "delete"))
            .collect();

        let updated: Vec<ItemOutcome> = batch
            .update
            .iter()
            .map(|item| {
                let result = self.update_one(bubble.id, item);
                outcome(Some(item.id), result.map(|_| ()), "update")
            })
            .collect();

        let created: Vec<ItemOutcome> = batch
            .create
            .iter()
            .map(|draft| match self.create_one(bubble.id, draft) {
                Ok(curve) => ItemOutcome {
                    id: Some(curve.id),
                    success: true,
                },
                Err(err) => outcome(None, Err(err), "create"),
            })
            .collect();

        let mut result = BatchResult {
            deleted,
            updated,
            created,
            status: BatchStatus::Ok,
        };
        let failures = result.failure_count();
        if failures > 0 {
            result.status = BatchStatus::FailExist;
        }

        info!(
            "event=curve_batch module=service status={} bubble_id={} deletes={} updates={} creates={} failures={failures}",
            if failures == 0 { "ok" } else { "partial" },
            bubble.id,
            result.deleted.len(),
            result.updated.len(),
            result.created.len(),
        );
        result
    }

    fn update_one(&self, bubble_id: BubbleId, item: &CurveUpdate) -> Result<Curve, CurveRepoError> {
        let draft = &item.curve;
        self.repo.update_curve(
            item.id,
            &draft.config.color,
            draft.config.thickness,
            bubble_id,
            &draft.encoded_points(),
        )
    }

    fn create_one(&self, bubble_id: BubbleId, draft: &CurveDraft) -> Result<Curve, CurveRepoError> {
        self.repo.create_curve(&NewCurve {
            bubble_id,
            color: draft.config.color.clone(),
            thickness: draft.config.thickness,
            control_point: draft.encoded_points(),
        })
    }
}

fn outcome(id: Option<CurveId>, result: Result<(), CurveRepoError>, op: &str) -> ItemOutcome {
    match result {
        Ok(()) => ItemOutcome { id, success: true },
        Err(err) => {
            match &err {
                CurveRepoError::CurveNotFound(_) | CurveRepoError::MalformedEncoding(_) => {}
                _ => warn!(
                    "event=curve_batch_item module=service status=error op={op} error={err}"
                ),
            }
            ItemOutcome { id, success: false }
        }
    }
}
