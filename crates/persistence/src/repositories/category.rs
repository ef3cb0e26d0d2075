//! Category repository. Categories form a tree through `parent_id`.

use std::collections::HashMap;

use domain::models::taxonomy::{CreateCategoryRequest, UpdateCategoryRequest};
use domain::services::check_parent;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::entities::CategoryEntity;
use crate::error::{RepositoryError, RepositoryResult};
use crate::metrics::QueryTimer;

const CATEGORY_COLUMNS: &str =
    "id, parent_id, name, code, description, icon_url, color_hex, sort_order, is_active, created_at";

/// Serializes structural changes to the tree.
const TREE_LOCK: &str = "SELECT pg_advisory_xact_lock(hashtext('categories.tree'))";

#[derive(Clone)]
pub struct CategoryRepository {
    pool: PgPool,
}

impl CategoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// List categories ordered for tree assembly.
    pub async fn list(&self, include_inactive: bool) -> Result<Vec<CategoryEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_categories");
        let result = sqlx::query_as::<_, CategoryEntity>(&format!(
            r#"
            SELECT {CATEGORY_COLUMNS} FROM categories
            WHERE ($1 OR is_active)
            ORDER BY sort_order, name
            "#
        ))
        .bind(include_inactive)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn find_by_code(&self, code: &str) -> Result<Option<CategoryEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_category_by_code");
        let result = sqlx::query_as::<_, CategoryEntity>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories WHERE code = $1"
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn create(&self, request: &CreateCategoryRequest) -> RepositoryResult<CategoryEntity> {
        let timer = QueryTimer::new("create_category");
        let mut tx = self.pool.begin().await?;

        let parent_id = match request.parent_code.as_deref() {
            Some(code) => Some(category_id_in(&mut tx, code).await?),
            None => None,
        };

        let entity = sqlx::query_as::<_, CategoryEntity>(&format!(
            r#"
            INSERT INTO categories (parent_id, name, code, description, icon_url, color_hex, sort_order)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {CATEGORY_COLUMNS}
            "#
        ))
        .bind(parent_id)
        .bind(&request.name)
        .bind(&request.code)
        .bind(request.description.as_deref())
        .bind(request.icon_url.as_deref())
        .bind(request.color_hex.as_deref())
        .bind(request.sort_order)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_write(e, "Category"))?;

        tx.commit().await?;
        timer.record();
        Ok(entity)
    }

    /// Update a category. Re-parenting takes the tree lock and rejects a new
    /// parent that is the category itself or one of its descendants.
    pub async fn update(
        &self,
        code: &str,
        request: &UpdateCategoryRequest,
    ) -> RepositoryResult<CategoryEntity> {
        let timer = QueryTimer::new("update_category");
        let mut tx = self.pool.begin().await?;

        let id = category_id_in(&mut tx, code).await?;

        let (reparent, parent_id) = match request.parent_code.as_deref() {
            None => (false, None),
            Some("") => (true, None),
            Some(parent_code) => {
                sqlx::query(TREE_LOCK).execute(&mut *tx).await?;
                let parent_id = category_id_in(&mut tx, parent_code).await?;
                let parents: HashMap<Uuid, Option<Uuid>> =
                    sqlx::query_as::<_, (Uuid, Option<Uuid>)>(
                        "SELECT id, parent_id FROM categories",
                    )
                    .fetch_all(&mut *tx)
                    .await?
                    .into_iter()
                    .collect();
                check_parent(id, Some(parent_id), &parents)?;
                (true, Some(parent_id))
            }
        };

        let entity = sqlx::query_as::<_, CategoryEntity>(&format!(
            r#"
            UPDATE categories SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                icon_url = COALESCE($4, icon_url),
                color_hex = COALESCE($5, color_hex),
                sort_order = COALESCE($6, sort_order),
                is_active = COALESCE($7, is_active),
                parent_id = CASE WHEN $8 THEN $9 ELSE parent_id END
            WHERE id = $1
            RETURNING {CATEGORY_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(request.name.as_deref())
        .bind(request.description.as_deref())
        .bind(request.icon_url.as_deref())
        .bind(request.color_hex.as_deref())
        .bind(request.sort_order)
        .bind(request.is_active)
        .bind(reparent)
        .bind(parent_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_write(e, "Category"))?;

        tx.commit().await?;
        timer.record();
        Ok(entity)
    }

    /// Delete a category. Children and prompt links block the delete.
    pub async fn delete(&self, code: &str) -> RepositoryResult<()> {
        let timer = QueryTimer::new("delete_category");
        let result = sqlx::query("DELETE FROM categories WHERE code = $1")
            .bind(code)
            .execute(&self.pool)
            .await;
        timer.record();
        let done = result.map_err(|e| RepositoryError::from_delete(e, "Category"))?;
        if done.rows_affected() == 0 {
            return Err(RepositoryError::not_found(format!("Category {code}")));
        }
        Ok(())
    }
}

pub(crate) async fn category_id_in(conn: &mut PgConnection, code: &str) -> RepositoryResult<Uuid> {
    sqlx::query_scalar::<_, Uuid>("SELECT id FROM categories WHERE code = $1")
        .bind(code)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| RepositoryError::not_found(format!("Category {code}")))
}
