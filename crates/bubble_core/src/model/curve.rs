//! Curve domain model.
//!
//! # Invariants
//! - `control_point.len()` is a multiple of
//!   [`ENCODED_WIDTH`](crate::model::control_point::ENCODED_WIDTH).
//! - Every curve is owned by exactly one bubble.

use crate::model::bubble::BubbleId;
use crate::model::control_point::{decode_sequence, encode_sequence, CodecError, ControlPoint};
use serde::{Deserialize, Serialize};

/// Storage-assigned curve identifier.
pub type CurveId = i64;

/// Persisted curve record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Curve {
    pub id: CurveId,
    pub bubble_id: BubbleId,
    pub color: String,
    pub thickness: f64,
    /// Concatenated fixed-width encodings of the ordered control points.
    pub control_point: String,
}

impl Curve {
    /// Decodes the stored control point sequence.
    pub fn points(&self) -> Result<Vec<ControlPoint>, CodecError> {
        decode_sequence(&self.control_point)
    }
}

/// Pen settings of a curve.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PenConfig {
    pub color: String,
    pub thickness: f64,
}

/// Client-supplied curve geometry: pen settings plus ordered points.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CurveDraft {
    pub config: PenConfig,
    pub position: Vec<ControlPoint>,
}

impl CurveDraft {
    /// Encodes `position` into the stored bit-string form.
    pub fn encoded_points(&self) -> String {
        encode_sequence(&self.position)
    }
}

/// Insert model for a new curve.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCurve {
    pub bubble_id: BubbleId,
    pub color: String,
    pub thickness: f64,
    pub control_point: String,
}
