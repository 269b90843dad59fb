//! Activity model module.
//!
//! Activities form a forest through `parent_id`. Nesting is capped at
//! [`MAX_ACTIVITY_LEVELS`] levels, roots being level 1.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteConnection};

use crate::error::{AppError, AppResult};

/// Deepest allowed level in the activity catalogue.
pub const MAX_ACTIVITY_LEVELS: i64 = 3;

/// How many levels below the requested activity a subtree search reaches.
pub const SEARCH_LEVELS_BELOW: i64 = 2;

/// Activity row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Activity {
    pub id: i64,
    pub name: String,
    pub parent_id: Option<i64>,
}

/// Struct for creating a new activity record.
#[derive(Debug, Clone)]
pub struct NewActivity {
    pub name: String,
    pub parent_id: Option<i64>,
}

/// In-memory view of the whole activity forest.
#[derive(Debug, Default)]
pub struct ActivityTree {
    children: HashMap<Option<i64>, Vec<Activity>>,
}

impl ActivityTree {
    /// Groups activities by parent. Siblings keep id order.
    pub fn new(mut activities: Vec<Activity>) -> Self {
        activities.sort_by_key(|a| a.id);

        let mut children: HashMap<Option<i64>, Vec<Activity>> = HashMap::new();
        for activity in activities {
            children.entry(activity.parent_id).or_default().push(activity);
        }

        Self { children }
    }

    /// Pre-order walk from the roots, keeping nodes at depth `< max_depth`.
    ///
    /// Roots sit at depth 0, so `max_depth = 1` yields only the roots.
    pub fn flatten(&self, max_depth: i64) -> Vec<Activity> {
        let mut out = Vec::new();
        if max_depth <= 0 {
            return out;
        }

        // Stack of (node, depth); children pushed in reverse to pop in id order
        let mut stack: Vec<(&Activity, i64)> = self
            .children_of(None)
            .iter()
            .rev()
            .map(|a| (a, 0))
            .collect();

        while let Some((activity, depth)) = stack.pop() {
            out.push(activity.clone());
            if depth + 1 < max_depth {
                stack.extend(
                    self.children_of(Some(activity.id))
                        .iter()
                        .rev()
                        .map(|c| (c, depth + 1)),
                );
            }
        }

        out
    }

    fn children_of(&self, parent_id: Option<i64>) -> &[Activity] {
        self.children.get(&parent_id).map_or(&[][..], Vec::as_slice)
    }
}

/// Activity repository for database operations.
pub struct ActivityRepository;

impl ActivityRepository {
    /// Loads every activity into an [`ActivityTree`].
    pub async fn load_tree(pool: &sqlx::SqlitePool) -> AppResult<ActivityTree> {
        let activities = sqlx::query_as::<_, Activity>(
            "SELECT id, name, parent_id FROM activities ORDER BY id",
        )
        .fetch_all(pool)
        .await?;

        Ok(ActivityTree::new(activities))
    }

    /// Ids of `root` and its descendants up to `levels_below` levels down.
    ///
    /// The root id is always part of the result, even when no such activity exists.
    pub async fn subtree_ids(
        pool: &sqlx::SqlitePool,
        root: i64,
        levels_below: i64,
    ) -> AppResult<Vec<i64>> {
        let ids: Vec<(i64,)> = sqlx::query_as(
            r"
            WITH RECURSIVE subtree(id, depth) AS (
                SELECT ?, 0
                UNION ALL
                SELECT a.id, subtree.depth + 1
                FROM activities a
                JOIN subtree ON a.parent_id = subtree.id
                WHERE subtree.depth < ?
            )
            SELECT DISTINCT id FROM subtree ORDER BY id
            ",
        )
        .bind(root)
        .bind(levels_below)
        .fetch_all(pool)
        .await?;

        Ok(ids.into_iter().map(|(id,)| id).collect())
    }

    /// Level of an activity in the catalogue (roots are level 1), `None` if absent.
    pub async fn level_of(conn: &mut SqliteConnection, id: i64) -> AppResult<Option<i64>> {
        let (level,): (Option<i64>,) = sqlx::query_as(
            r"
            WITH RECURSIVE ancestry(id, parent_id, level) AS (
                SELECT id, parent_id, 1 FROM activities WHERE id = ?
                UNION ALL
                SELECT a.id, a.parent_id, ancestry.level + 1
                FROM activities a
                JOIN ancestry ON a.id = ancestry.parent_id
                WHERE ancestry.level < 64
            )
            SELECT MAX(level) FROM ancestry
            ",
        )
        .bind(id)
        .fetch_one(conn)
        .await?;

        Ok(level)
    }

    /// Inserts an activity, refusing to nest deeper than [`MAX_ACTIVITY_LEVELS`].
    pub async fn create(conn: &mut SqliteConnection, new: &NewActivity) -> AppResult<Activity> {
        if let Some(parent_id) = new.parent_id {
            let parent_level = Self::level_of(conn, parent_id)
                .await?
                .ok_or_else(|| {
                    AppError::Validation(format!("Parent activity {parent_id} does not exist"))
                })?;

            if parent_level >= MAX_ACTIVITY_LEVELS {
                return Err(AppError::Validation(format!(
                    "Activity nesting is limited to {MAX_ACTIVITY_LEVELS} levels"
                )));
            }
        }

        let activity = sqlx::query_as::<_, Activity>(
            r"
            INSERT INTO activities (name, parent_id)
            VALUES (?, ?)
            RETURNING id, name, parent_id
            ",
        )
        .bind(&new.name)
        .bind(new.parent_id)
        .fetch_one(conn)
        .await?;

        Ok(activity)
    }
}
