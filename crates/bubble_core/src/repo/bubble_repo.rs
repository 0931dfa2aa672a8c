//! Bubble tree repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist bubbles keyed by `(workspace_id, path)`.
//! - Provide exact, children, depth and subtree lookups over materialized paths.
//! - Run create and subtree moves as single immediate transactions.
//!
//! # Invariants
//! - Stored `path_depth` always equals the depth of the stored path.
//! - Non-root bubbles are only created under an existing parent path.
//! - Descendant matching is segment-aware and uses `substr`, never `LIKE`.
//! - Deleting a bubble cascades to its curves through the foreign key.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::bubble::{Bubble, BubbleAttributes, BubbleGeometry, BubbleId, NewBubble, WorkspaceId};
use crate::model::path::{BubblePath, PathError};
use crate::model::relocation::plan_descendant_rewrites;
use crate::repo::{bool_to_int, ensure_table_columns, int_to_bool, parse_uuid, SchemaCheckError};
use log::{debug, info};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

const BUBBLE_SELECT_SQL: &str = "SELECT
    id,
    workspace_id,
    name,
    path,
    path_depth,
    top,
    leftmost,
    width,
    height,
    bubblized,
    visible
FROM bubbles";

const BUBBLE_COLUMNS: &[&str] = &[
    "id",
    "workspace_id",
    "name",
    "path",
    "path_depth",
    "top",
    "leftmost",
    "width",
    "height",
    "bubblized",
    "visible",
    "created_at",
    "updated_at",
];

/// Result type used by bubble repository operations.
pub type BubbleRepoResult<T> = Result<T, BubbleRepoError>;

/// Errors from bubble repository operations.
#[derive(Debug)]
pub enum BubbleRepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// No bubble at the requested path.
    BubbleNotFound {
        workspace_id: WorkspaceId,
        path: String,
    },
    /// No bubble with the given id.
    BubbleIdNotFound(BubbleId),
    /// A bubble already occupies the requested path.
    AlreadyExists {
        workspace_id: WorkspaceId,
        path: String,
    },
    /// Parent path of a non-root bubble does not resolve.
    NoParent {
        workspace_id: WorkspaceId,
        parent_path: String,
    },
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Required column is missing from expected table.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// Persisted data cannot be converted to a valid bubble.
    InvalidData(String),
}

impl Display for BubbleRepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::BubbleNotFound { workspace_id, path } => {
                write!(f, "bubble not found: `{path}` in workspace {workspace_id}")
            }
            Self::BubbleIdNotFound(id) => write!(f, "bubble not found: id {id}"),
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
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "bubble repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "bubble repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "bubble repository requires column `{column}` in table `{table}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid bubble data: {message}"),
        }
    }
}

impl Error for BubbleRepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for BubbleRepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for BubbleRepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<SchemaCheckError> for BubbleRepoError {
    fn from(value: SchemaCheckError) -> Self {
        match value {
            SchemaCheckError::Db(err) => Self::from(err),
            SchemaCheckError::Version { expected, actual } => Self::UninitializedConnection {
                expected_version: expected,
                actual_version: actual,
            },
            SchemaCheckError::MissingTable(table) => Self::MissingRequiredTable(table),
            SchemaCheckError::MissingColumn { table, column } => {
                Self::MissingRequiredColumn { table, column }
            }
        }
    }
}

/// Repository interface for the workspace bubble tree.
pub trait BubbleRepository {
    /// Loads the bubble at `path`, if any.
    fn get_by_path(
        &self,
        workspace_id: WorkspaceId,
        path: &BubblePath,
    ) -> BubbleRepoResult<Option<Bubble>>;
    /// Lists direct children of `parent`, ordered by id.
    fn find_children(
        &self,
        workspace_id: WorkspaceId,
        parent: &BubblePath,
    ) -> BubbleRepoResult<Vec<Bubble>>;
    /// Lists bubbles at `depth`, ordered by id.
    fn find_by_depth(&self, workspace_id: WorkspaceId, depth: u32)
        -> BubbleRepoResult<Vec<Bubble>>;
    /// Returns one bubble of greatest depth. Ties resolve to the lowest id.
    fn max_depth(&self, workspace_id: WorkspaceId) -> BubbleRepoResult<Option<Bubble>>;
    /// Lists `root` and its descendants less than `levels` below it,
    /// ordered by `(path_depth, path)`.
    fn find_subtree(
        &self,
        workspace_id: WorkspaceId,
        root: &BubblePath,
        levels: u32,
    ) -> BubbleRepoResult<Vec<Bubble>>;
    /// Creates one bubble, deriving its depth from the parent.
    fn create_bubble(&self, bubble: &NewBubble) -> BubbleRepoResult<Bubble>;
    /// Replaces every field of the bubble with `bubble.id` in place.
    ///
    /// Tree consistency is the caller's responsibility.
    fn update_bubble(&self, bubble: &Bubble) -> BubbleRepoResult<()>;
    /// Deletes `root` and all of its descendants. Returns removed row count.
    fn delete_subtree(&self, workspace_id: WorkspaceId, root: &BubblePath)
        -> BubbleRepoResult<usize>;
    /// Moves the bubble at `old_path` to `new_path`, cascading the prefix
    /// change to every descendant, and applies `attributes` to the target.
    fn move_subtree(
        &self,
        workspace_id: WorkspaceId,
        old_path: &BubblePath,
        new_path: &BubblePath,
        attributes: &BubbleAttributes,
    ) -> BubbleRepoResult<Bubble>;

    /// Like [`BubbleRepository::get_by_path`] but fails when absent.
    fn find_by_path(
        &self,
        workspace_id: WorkspaceId,
        path: &BubblePath,
    ) -> BubbleRepoResult<Bubble> {
        self.get_by_path(workspace_id, path)?
            .ok_or_else(|| BubbleRepoError::BubbleNotFound {
                workspace_id,
                path: path.to_string(),
            })
    }
}

/// SQLite-backed bubble repository.
pub struct SqliteBubbleRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteBubbleRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> BubbleRepoResult<Self> {
        ensure_table_columns(conn, latest_version(), "bubbles", BUBBLE_COLUMNS)?;
        Ok(Self { conn })
    }
}

impl BubbleRepository for SqliteBubbleRepository<'_> {
    fn get_by_path(
        &self,
        workspace_id: WorkspaceId,
        path: &BubblePath,
    ) -> BubbleRepoResult<Option<Bubble>> {
        load_by_path(self.conn, workspace_id, path)
    }

    fn find_children(
        &self,
        workspace_id: WorkspaceId,
        parent: &BubblePath,
    ) -> BubbleRepoResult<Vec<Bubble>> {
        // Child = `parent/` prefix followed by exactly one segment.
        query_bubbles(
            self.conn,
            &format!(
                "{BUBBLE_SELECT_SQL}
                 WHERE workspace_id = ?1
                   AND substr(path, 1, length(?2) + 1) = ?2 || '/'
                   AND instr(substr(path, length(?2) + 2), '/') = 0
                 ORDER BY id ASC;"
            ),
            params![workspace_id.to_string(), parent.as_str()],
        )
    }

    fn find_by_depth(
        &self,
        workspace_id: WorkspaceId,
        depth: u32,
    ) -> BubbleRepoResult<Vec<Bubble>> {
        query_bubbles(
            self.conn,
            &format!(
                "{BUBBLE_SELECT_SQL}
                 WHERE workspace_id = ?1
                   AND path_depth = ?2
                 ORDER BY id ASC;"
            ),
            params![workspace_id.to_string(), depth],
        )
    }

    fn max_depth(&self, workspace_id: WorkspaceId) -> BubbleRepoResult<Option<Bubble>> {
        let mut items = query_bubbles(
            self.conn,
            &format!(
                "{BUBBLE_SELECT_SQL}
                 WHERE workspace_id = ?1
                 ORDER BY path_depth DESC, id ASC
                 LIMIT 1;"
            ),
            params![workspace_id.to_string()],
        )?;
        Ok(items.pop())
    }

    fn find_subtree(
        &self,
        workspace_id: WorkspaceId,
        root: &BubblePath,
        levels: u32,
    ) -> BubbleRepoResult<Vec<Bubble>> {
        if levels == 0 {
            return Ok(Vec::new());
        }
        let depth_limit = root.depth() + levels;
        query_bubbles(
            self.conn,
            &format!(
                "{BUBBLE_SELECT_SQL}
                 WHERE workspace_id = ?1
                   AND (path = ?2 OR substr(path, 1, length(?2) + 1) = ?2 || '/')
                   AND path_depth < ?3
                 ORDER BY path_depth ASC, path ASC;"
            ),
            params![workspace_id.to_string(), root.as_str(), depth_limit],
        )
    }

    fn create_bubble(&self, bubble: &NewBubble) -> BubbleRepoResult<Bubble> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        let path_depth = match bubble.path.parent() {
            None => 1,
            Some(parent_path) => {
                let parent = load_by_path(&tx, bubble.workspace_id, &parent_path)?.ok_or_else(
                    || BubbleRepoError::NoParent {
                        workspace_id: bubble.workspace_id,
                        parent_path: parent_path.to_string(),
                    },
                )?;
                parent.path_depth + 1
            }
        };

        if load_by_path(&tx, bubble.workspace_id, &bubble.path)?.is_some() {
            return Err(BubbleRepoError::AlreadyExists {
                workspace_id: bubble.workspace_id,
                path: bubble.path.to_string(),
            });
        }

        let attributes = &bubble.attributes;
        tx.execute(
            "INSERT INTO bubbles (
                workspace_id,
                name,
                path,
                path_depth,
                top,
                leftmost,
                width,
                height,
                bubblized,
                visible
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10);",
            params![
                bubble.workspace_id.to_string(),
                attributes.name.as_str(),
                bubble.path.as_str(),
                path_depth,
                attributes.geometry.top,
                attributes.geometry.leftmost,
                attributes.geometry.width,
                attributes.geometry.height,
                bool_to_int(attributes.bubblized),
                bool_to_int(attributes.visible),
            ],
        )?;
        let id = tx.last_insert_rowid();
        let created = load_by_id(&tx, id)?;
        tx.commit()?;

        debug!(
            "event=bubble_create module=repo status=ok bubble_id={} depth={}",
            created.id, created.path_depth
        );
        Ok(created)
    }

    fn update_bubble(&self, bubble: &Bubble) -> BubbleRepoResult<()> {
        write_bubble_row(self.conn, bubble)
    }

    fn delete_subtree(
        &self,
        workspace_id: WorkspaceId,
        root: &BubblePath,
    ) -> BubbleRepoResult<usize> {
        let removed = self.conn.execute(
            "DELETE FROM bubbles
             WHERE workspace_id = ?1
               AND (path = ?2 OR substr(path, 1, length(?2) + 1) = ?2 || '/');",
            params![workspace_id.to_string(), root.as_str()],
        )?;
        Ok(removed)
    }

    fn move_subtree(
        &self,
        workspace_id: WorkspaceId,
        old_path: &BubblePath,
        new_path: &BubblePath,
        attributes: &BubbleAttributes,
    ) -> BubbleRepoResult<Bubble> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        let mut target = load_by_path(&tx, workspace_id, old_path)?.ok_or_else(|| {
            BubbleRepoError::BubbleNotFound {
                workspace_id,
                path: old_path.to_string(),
            }
        })?;

        // Snapshot the whole subtree before any row changes.
        let snapshot = query_bubbles(
            &tx,
            &format!(
                "{BUBBLE_SELECT_SQL}
                 WHERE workspace_id = ?1
                   AND substr(path, 1, length(?2) + 1) = ?2 || '/';"
            ),
            params![workspace_id.to_string(), old_path.as_str()],
        )?;
        let plan = plan_descendant_rewrites(&snapshot, old_path, new_path);

        for rewrite in &plan {
            tx.execute(
                "UPDATE bubbles
                 SET path = ?2,
                     path_depth = ?3,
                     updated_at = (strftime('%s', 'now') * 1000)
                 WHERE id = ?1;",
                params![rewrite.bubble_id, rewrite.path.as_str(), rewrite.path_depth],
            )?;
        }

        target.apply(attributes);
        target.path = new_path.clone();
        target.path_depth = new_path.depth();
        write_bubble_row(&tx, &target)?;

        tx.commit()?;

        info!(
            "event=bubble_move module=repo status=ok bubble_id={} descendants={} from_depth={} to_depth={}",
            target.id,
            plan.len(),
            old_path.depth(),
            target.path_depth
        );
        Ok(target)
    }
}

fn write_bubble_row(conn: &Connection, bubble: &Bubble) -> BubbleRepoResult<()> {
    let changed = conn.execute(
        "UPDATE bubbles
         SET name = ?2,
             path = ?3,
             path_depth = ?4,
             top = ?5,
             leftmost = ?6,
             width = ?7,
             height = ?8,
             bubblized = ?9,
             visible = ?10,
             workspace_id = ?11,
             updated_at = (strftime('%s', 'now') * 1000)
         WHERE id = ?1;",
        params![
            bubble.id,
            bubble.name.as_str(),
            bubble.path.as_str(),
            bubble.path_depth,
            bubble.geometry.top,
            bubble.geometry.leftmost,
            bubble.geometry.width,
            bubble.geometry.height,
            bool_to_int(bubble.bubblized),
            bool_to_int(bubble.visible),
            bubble.workspace_id.to_string(),
        ],
    )?;
    if changed == 0 {
        return Err(BubbleRepoError::BubbleIdNotFound(bubble.id));
    }
    Ok(())
}

fn load_by_path(
    conn: &Connection,
    workspace_id: WorkspaceId,
    path: &BubblePath,
) -> BubbleRepoResult<Option<Bubble>> {
    let sql = format!(
        "{BUBBLE_SELECT_SQL}
         WHERE workspace_id = ?1
           AND path = ?2;"
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params![workspace_id.to_string(), path.as_str()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_bubble_row(row)?));
    }
    Ok(None)
}

fn load_by_id(conn: &Connection, id: BubbleId) -> BubbleRepoResult<Bubble> {
    let sql = format!("{BUBBLE_SELECT_SQL} WHERE id = ?1;");
    let row = conn
        .query_row(&sql, [id], |row| Ok(parse_bubble_row(row)))
        .optional()?;
    match row {
        Some(parsed) => parsed,
        None => Err(BubbleRepoError::InvalidData(format!(
            "bubble id {id} vanished after insert"
        ))),
    }
}

fn query_bubbles(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> BubbleRepoResult<Vec<Bubble>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params)?;
    let mut items = Vec::new();
    while let Some(row) = rows.next()? {
        items.push(parse_bubble_row(row)?);
    }
    Ok(items)
}

fn parse_bubble_row(row: &Row<'_>) -> BubbleRepoResult<Bubble> {
    let workspace_text: String = row.get("workspace_id")?;
    let workspace_id = parse_uuid(&workspace_text, "bubbles.workspace_id")
        .map_err(BubbleRepoError::InvalidData)?;

    let path_text: String = row.get("path")?;
    let path = BubblePath::parse(path_text).map_err(|err: PathError| {
        BubbleRepoError::InvalidData(format!("invalid path in bubbles.path: {err}"))
    })?;

    let path_depth: u32 = row.get("path_depth")?;
    if path_depth != path.depth() {
        return Err(BubbleRepoError::InvalidData(format!(
            "bubbles.path_depth {path_depth} does not match path `{path}`"
        )));
    }

    Ok(Bubble {
        id: row.get("id")?,
        workspace_id,
        name: row.get("name")?,
        path,
        path_depth,
        geometry: BubbleGeometry {
            top: row.get("top")?,
            leftmost: row.get("leftmost")?,
            width: row.get("width")?,
            height: row.get("height")?,
        },
        bubblized: int_to_bool(row.get("bubblized")?, "bubbles.bubblized")
            .map_err(BubbleRepoError::InvalidData)?,
        visible: int_to_bool(row.get("visible")?, "bubbles.visible")
            .map_err(BubbleRepoError::InvalidData)?,
    })
}
