//! Curve repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide single-item CRUD over curves keyed by id.
//! - Keep encoded geometry valid at the persistence boundary.
//!
//! # Invariants
//! - Write paths validate the control point encoding before SQL mutations.
//! - Every statement is its own atomic unit; callers batch items themselves.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::bubble::BubbleId;
use crate::model::control_point::{validate_encoded, CodecError};
use crate::model::curve::{Curve, CurveId, NewCurve};
use crate::repo::{ensure_table_columns, SchemaCheckError};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

const CURVE_SELECT_SQL: &str = "SELECT
    id,
    bubble_id,
    color,
    thickness,
    control_point
FROM curves";

const CURVE_COLUMNS: &[&str] = &[
    "id",
    "bubble_id",
    "color",
    "thickness",
    "control_point",
    "created_at",
    "updated_at",
];

pub type CurveRepoResult<T> = Result<T, CurveRepoError>;

/// Errors from curve repository operations.
#[derive(Debug)]
pub enum CurveRepoError {
    Db(DbError),
    CurveNotFound(CurveId),
    MalformedEncoding(CodecError),
    /// Repository constructed over a connection that is not fully migrated.
    SchemaNotReady(String),
    InvalidData(String),
}

impl Display for CurveRepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::CurveNotFound(id) => write!(f, "curve not found: {id}"),
            Self::MalformedEncoding(err) => write!(f, "{err}"),
            Self::SchemaNotReady(message) => write!(f, "curve repository not ready: {message}"),
            Self::InvalidData(message) => write!(f, "invalid persisted curve data: {message}"),
        }
    }
}

impl Error for CurveRepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::MalformedEncoding(err) => Some(err),
            Self::CurveNotFound(_) => None,
            Self::SchemaNotReady(_) => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for CurveRepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for CurveRepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<CodecError> for CurveRepoError {
    fn from(value: CodecError) -> Self {
        Self::MalformedEncoding(value)
    }
}

impl From<SchemaCheckError> for CurveRepoError {
    fn from(value: SchemaCheckError) -> Self {
        match value {
            SchemaCheckError::Db(err) => Self::from(err),
            SchemaCheckError::Version { expected, actual } => Self::SchemaNotReady(format!(
                "expected schema version {expected}, got {actual}"
            )),
            SchemaCheckError::MissingTable(table) => {
                Self::SchemaNotReady(format!("missing table `{table}`"))
            }
            SchemaCheckError::MissingColumn { table, column } => {
                Self::SchemaNotReady(format!("missing column `{column}` in `{table}`"))
            }
        }
    }
}

/// Repository interface for curve CRUD operations.
pub trait CurveRepository {
    fn find_curve(&self, id: CurveId) -> CurveRepoResult<Curve>;
    /// Lists curves owned by `bubble_id`, ordered by id.
    fn list_for_bubble(&self, bubble_id: BubbleId) -> CurveRepoResult<Vec<Curve>>;
    fn create_curve(&self, curve: &NewCurve) -> CurveRepoResult<Curve>;
    /// Replaces style, owner and geometry of one curve.
    fn update_curve(
        &self,
        id: CurveId,
        color: &str,
        thickness: f64,
        bubble_id: BubbleId,
        control_point: &str,
    ) -> CurveRepoResult<Curve>;
    fn delete_curve(&self, id: CurveId) -> CurveRepoResult<()>;
}

/// SQLite-backed curve repository.
pub struct SqliteCurveRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCurveRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> CurveRepoResult<Self> {
        ensure_table_columns(conn, latest_version(), "curves", CURVE_COLUMNS)?;
        Ok(Self { conn })
    }
}

impl CurveRepository for SqliteCurveRepository<'_> {
    fn find_curve(&self, id: CurveId) -> CurveRepoResult<Curve> {
        let row = self
            .conn
            .query_row(&format!("{CURVE_SELECT_SQL} WHERE id = ?1;"), [id], |row| {
                Ok(parse_curve_row(row))
            })
            .optional()?;
        match row {
            Some(curve) => curve,
            None => Err(CurveRepoError::CurveNotFound(id)),
        }
    }

    fn list_for_bubble(&self, bubble_id: BubbleId) -> CurveRepoResult<Vec<Curve>> {
        let mut stmt = self.conn.prepare(&format!(
            "{CURVE_SELECT_SQL}
             WHERE bubble_id = ?1
             ORDER BY id ASC;"
        ))?;
        let mut rows = stmt.query([bubble_id])?;
        let mut curves = Vec::new();
        while let Some(row) = rows.next()? {
            curves.push(parse_curve_row(row)?);
        }
        Ok(curves)
    }

    fn create_curve(&self, curve: &NewCurve) -> CurveRepoResult<Curve> {
        validate_encoded(&curve.control_point)?;

        self.conn.execute(
            "INSERT INTO curves (
                bubble_id,
                color,
                thickness,
                control_point
            ) VALUES (?1, ?2, ?3, ?4);",
            params![
                curve.bubble_id,
                curve.color.as_str(),
                curve.thickness,
                curve.control_point.as_str(),
            ],
        )?;

        Ok(Curve {
            id: self.conn.last_insert_rowid(),
            bubble_id: curve.bubble_id,
            color: curve.color.clone(),
            thickness: curve.thickness,
            control_point: curve.control_point.clone(),
        })
    }

    fn update_curve(
        &self,
        id: CurveId,
        color: &str,
        thickness: f64,
        bubble_id: BubbleId,
        control_point: &str,
    ) -> CurveRepoResult<Curve> {
        validate_encoded(control_point)?;

        let changed = self.conn.execute(
            "UPDATE curves
             SET
                color = ?2,
                thickness = ?3,
                bubble_id = ?4,
                control_point = ?5,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![id, color, thickness, bubble_id, control_point],
        )?;

        if changed == 0 {
            return Err(CurveRepoError::CurveNotFound(id));
        }

        Ok(Curve {
            id,
            bubble_id,
            color: color.to_string(),
            thickness,
            control_point: control_point.to_string(),
        })
    }

    fn delete_curve(&self, id: CurveId) -> CurveRepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM curves WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(CurveRepoError::CurveNotFound(id));
        }
        Ok(())
    }
}

fn parse_curve_row(row: &Row<'_>) -> CurveRepoResult<Curve> {
    let control_point: String = row.get("control_point")?;
    validate_encoded(&control_point).map_err(|err| {
        CurveRepoError::InvalidData(format!("curves.control_point: {err}"))
    })?;

    Ok(Curve {
        id: row.get("id")?,
        bubble_id: row.get("bubble_id")?,
        color: row.get("color")?,
        thickness: row.get("thickness")?,
        control_point,
    })
}
