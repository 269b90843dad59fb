//! Building model module.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteConnection};

use crate::error::AppResult;

/// A building that hosts organizations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Building {
    pub id: i64,
    pub address: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

/// Struct for creating a new building record.
#[derive(Debug, Clone)]
pub struct NewBuilding {
    pub address: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

/// Building repository for database operations.
pub struct BuildingRepository;

impl BuildingRepository {
    /// Inserts a building and returns the stored row.
    pub async fn create(conn: &mut SqliteConnection, new: &NewBuilding) -> AppResult<Building> {
        let building = sqlx::query_as::<_, Building>(
            r"
            INSERT INTO buildings (address, lat, lon)
            VALUES (?, ?, ?)
            RETURNING id, address, lat, lon
            ",
        )
        .bind(&new.address)
        .bind(new.lat)
        .bind(new.lon)
        .fetch_one(conn)
        .await?;

        Ok(building)
    }

    /// Finds a building by id.
    pub async fn find_by_id(pool: &sqlx::SqlitePool, id: i64) -> AppResult<Option<Building>> {
        let building = sqlx::query_as::<_, Building>(
            "SELECT id, address, lat, lon FROM buildings WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(building)
    }
}
