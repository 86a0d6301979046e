//! Unit rating repository.

use super::health_unit_repo::load_unit;
use super::revision::{self, RevisionAction, ENTITY_HEALTH_UNIT, ENTITY_RATING};
use super::{bool_to_int, parse_audit, parse_u32, parse_uuid, RepoError, RepoResult};
use crate::model::health_unit::HealthUnitId;
use crate::model::rating::{ChuRating, RatingId};
use rusqlite::{params, Connection, Transaction, TransactionBehavior};

pub trait RatingRepository {
    /// Records a rating for a live unit after range validation.
    fn create_rating(&self, rating: &ChuRating) -> RepoResult<RatingId>;
    /// Live ratings of one unit, oldest first.
    fn list_ratings(&self, unit_id: HealthUnitId) -> RepoResult<Vec<ChuRating>>;
}

pub struct SqliteRatingRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRatingRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl RatingRepository for SqliteRatingRepository<'_> {
    fn create_rating(&self, rating: &ChuRating) -> RepoResult<RatingId> {
        rating.validate()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        if load_unit(&tx, rating.health_unit_id, false)?.is_none() {
            return Err(RepoError::not_found(
                ENTITY_HEALTH_UNIT,
                rating.health_unit_id,
            ));
        }

        tx.execute(
            "INSERT INTO chu_ratings (
                id,
                health_unit_id,
                rating,
                comment,
                created_at,
                updated_at,
                active
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                rating.id.to_string(),
                rating.health_unit_id.to_string(),
                rating.rating,
                rating.comment.as_deref(),
                rating.audit.created_at,
                rating.audit.updated_at,
                bool_to_int(rating.audit.active),
            ],
        )?;
        revision::record(&tx, ENTITY_RATING, rating.id, RevisionAction::Create, rating)?;
        tx.commit()?;

        Ok(rating.id)
    }

    fn list_ratings(&self, unit_id: HealthUnitId) -> RepoResult<Vec<ChuRating>> {
        const TABLE: &str = "chu_ratings";
        let mut stmt = self.conn.prepare(
            "SELECT id, health_unit_id, rating, comment, created_at, updated_at, active, deleted_at
             FROM chu_ratings
             WHERE health_unit_id = ?1 AND deleted_at IS NULL
             ORDER BY created_at ASC, rowid ASC;",
        )?;
        let mut rows = stmt.query([unit_id.to_string()])?;
        let mut ratings = Vec::new();
        while let Some(row) = rows.next()? {
            let id: String = row.get("id")?;
            let health_unit_id: String = row.get("health_unit_id")?;
            ratings.push(ChuRating {
                id: parse_uuid(TABLE, "id", &id)?,
                health_unit_id: parse_uuid(TABLE, "health_unit_id", &health_unit_id)?,
                rating: parse_u32(TABLE, "rating", row.get("rating")?)?,
                comment: row.get("comment")?,
                audit: parse_audit(row, TABLE)?,
            });
        }
        Ok(ratings)
    }
}
