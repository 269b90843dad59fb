//! Organization model module.
//!
//! Organizations are always loaded together with their building and
//! activities; list queries fetch activities for the whole page in one query.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection};

use crate::error::AppResult;
use crate::models::activity::Activity;
use crate::models::building::Building;

/// Ids bound per `IN (...)` list, well under SQLite's bind parameter limit.
const BIND_CHUNK_SIZE: usize = 900;

const SELECT_ORGANIZATIONS: &str = r"
    SELECT o.id, o.name, o.phones, o.building_id, b.address, b.lat, b.lon
    FROM organizations o
    JOIN buildings b ON b.id = o.building_id
";

/// Organization row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Organization {
    pub id: i64,
    pub name: String,
    /// Comma-separated phone numbers
    pub phones: String,
    pub building_id: i64,
}

/// Organization joined with its building and activities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganizationDetails {
    pub id: i64,
    pub name: String,
    pub phones: String,
    pub building: Building,
    pub activities: Vec<Activity>,
}

/// Struct for creating a new organization record.
#[derive(Debug, Clone)]
pub struct NewOrganization {
    pub name: String,
    pub phones: Vec<String>,
    pub building_id: i64,
    pub activity_ids: Vec<i64>,
}

/// Flat row produced by the organization/building join.
#[derive(Debug, FromRow)]
struct OrganizationRow {
    id: i64,
    name: String,
    phones: String,
    building_id: i64,
    address: String,
    lat: Option<f64>,
    lon: Option<f64>,
}

impl OrganizationRow {
    fn into_details(self, activities: Vec<Activity>) -> OrganizationDetails {
        OrganizationDetails {
            id: self.id,
            name: self.name,
            phones: self.phones,
            building: Building {
                id: self.building_id,
                address: self.address,
                lat: self.lat,
                lon: self.lon,
            },
            activities,
        }
    }
}

#[derive(Debug, FromRow)]
struct LinkedActivityRow {
    organization_id: i64,
    id: i64,
    name: String,
    parent_id: Option<i64>,
}

/// Joins phone numbers into their stored form.
pub fn join_phones(phones: &[String]) -> String {
    phones
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(",")
}

/// Case folding shared by the stored `name_folded` column and search needles.
///
/// `SQLite`'s own `lower()` only folds ASCII, so folding happens here.
pub fn fold_name(name: &str) -> String {
    name.to_lowercase()
}

/// Organization repository for database operations.
pub struct OrganizationRepository;

impl OrganizationRepository {
    /// Finds one organization with its building and activities.
    pub async fn find_by_id(
        pool: &sqlx::SqlitePool,
        id: i64,
    ) -> AppResult<Option<OrganizationDetails>> {
        let mut qb = QueryBuilder::<Sqlite>::new(SELECT_ORGANIZATIONS);
        qb.push(" WHERE o.id = ").push_bind(id);

        let row = qb
            .build_query_as::<OrganizationRow>()
            .fetch_optional(pool)
            .await?;

        match row {
            Some(row) => Ok(Self::attach_activities(pool, vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    /// Organizations located in the given building.
    pub async fn list_by_building(
        pool: &sqlx::SqlitePool,
        building_id: i64,
    ) -> AppResult<Vec<OrganizationDetails>> {
        let mut qb = QueryBuilder::<Sqlite>::new(SELECT_ORGANIZATIONS);
        qb.push(" WHERE o.building_id = ")
            .push_bind(building_id)
            .push(" ORDER BY o.id");

        let rows = qb.build_query_as::<OrganizationRow>().fetch_all(pool).await?;
        Self::attach_activities(pool, rows).await
    }

    /// Organizations linked to any of the given activities, each listed once.
    pub async fn list_by_activities(
        pool: &sqlx::SqlitePool,
        activity_ids: &[i64],
    ) -> AppResult<Vec<OrganizationDetails>> {
        // Keyed by id so chunks merge without duplicates and stay ordered
        let mut found: BTreeMap<i64, OrganizationRow> = BTreeMap::new();

        for chunk in activity_ids.chunks(BIND_CHUNK_SIZE) {
            let mut qb = QueryBuilder::<Sqlite>::new(SELECT_ORGANIZATIONS);
            qb.push(
                " WHERE o.id IN (SELECT organization_id FROM organization_activities WHERE activity_id IN (",
            );
            let mut separated = qb.separated(", ");
            for id in chunk {
                separated.push_bind(*id);
            }
            separated.push_unseparated("))");

            let rows = qb.build_query_as::<OrganizationRow>().fetch_all(pool).await?;
            for row in rows {
                found.entry(row.id).or_insert(row);
            }
        }

        Self::attach_activities(pool, found.into_values().collect()).await
    }

    /// Organizations in buildings within `radius` of the point (planar distance, inclusive).
    ///
    /// Buildings without coordinates never match.
    pub async fn list_within_radius(
        pool: &sqlx::SqlitePool,
        lat: f64,
        lon: f64,
        radius: f64,
    ) -> AppResult<Vec<OrganizationDetails>> {
        let mut qb = QueryBuilder::<Sqlite>::new(SELECT_ORGANIZATIONS);
        qb.push(" WHERE b.lat IS NOT NULL AND b.lon IS NOT NULL AND (b.lat - ")
            .push_bind(lat)
            .push(") * (b.lat - ")
            .push_bind(lat)
            .push(") + (b.lon - ")
            .push_bind(lon)
            .push(") * (b.lon - ")
            .push_bind(lon)
            .push(") <= ")
            .push_bind(radius * radius)
            .push(" ORDER BY o.id");

        let rows = qb.build_query_as::<OrganizationRow>().fetch_all(pool).await?;
        Self::attach_activities(pool, rows).await
    }

    /// Organizations whose name contains `needle`, ignoring case.
    ///
    /// Matches against `name_folded` with `instr`, so `%` and `_` are literal.
    pub async fn search_by_name(
        pool: &sqlx::SqlitePool,
        needle: &str,
    ) -> AppResult<Vec<OrganizationDetails>> {
        let mut qb = QueryBuilder::<Sqlite>::new(SELECT_ORGANIZATIONS);
        if !needle.is_empty() {
            qb.push(" WHERE instr(o.name_folded, ")
                .push_bind(fold_name(needle))
                .push(") > 0");
        }
        qb.push(" ORDER BY o.id");

        let rows = qb.build_query_as::<OrganizationRow>().fetch_all(pool).await?;
        Self::attach_activities(pool, rows).await
    }

    /// Number of stored organizations.
    pub async fn count(pool: &sqlx::SqlitePool) -> AppResult<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM organizations")
            .fetch_one(pool)
            .await?;
        Ok(count)
    }

    /// Inserts an organization together with its activity links.
    pub async fn create(
        conn: &mut SqliteConnection,
        new: &NewOrganization,
    ) -> AppResult<Organization> {
        let organization = sqlx::query_as::<_, Organization>(
            r"
            INSERT INTO organizations (name, name_folded, phones, building_id)
            VALUES (?, ?, ?, ?)
            RETURNING id, name, phones, building_id
            ",
        )
        .bind(&new.name)
        .bind(fold_name(&new.name))
        .bind(join_phones(&new.phones))
        .bind(new.building_id)
        .fetch_one(&mut *conn)
        .await?;

        for activity_id in &new.activity_ids {
            sqlx::query(
                r"
                INSERT INTO organization_activities (organization_id, activity_id)
                VALUES (?, ?)
                ON CONFLICT (organization_id, activity_id) DO NOTHING
                ",
            )
            .bind(organization.id)
            .bind(activity_id)
            .execute(&mut *conn)
            .await?;
        }

        Ok(organization)
    }

    /// Loads activities for the rows, one query per chunk of ids, and builds the details.
    async fn attach_activities(
        pool: &sqlx::SqlitePool,
        rows: Vec<OrganizationRow>,
    ) -> AppResult<Vec<OrganizationDetails>> {
        let mut by_organization: HashMap<i64, Vec<Activity>> = HashMap::new();

        for chunk in rows.chunks(BIND_CHUNK_SIZE) {
            let mut qb = QueryBuilder::<Sqlite>::new(
                r"
                SELECT oa.organization_id, a.id, a.name, a.parent_id
                FROM organization_activities oa
                JOIN activities a ON a.id = oa.activity_id
                WHERE oa.organization_id IN (",
            );
            let mut separated = qb.separated(", ");
            for row in chunk {
                separated.push_bind(row.id);
            }
            separated.push_unseparated(") ORDER BY oa.organization_id, a.id");

            let links = qb
                .build_query_as::<LinkedActivityRow>()
                .fetch_all(pool)
                .await?;

            for link in links {
                by_organization
                    .entry(link.organization_id)
                    .or_default()
                    .push(Activity {
                        id: link.id,
                        name: link.name,
                        parent_id: link.parent_id,
                    });
            }
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let activities = by_organization.remove(&row.id).unwrap_or_default();
                row.into_details(activities)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_phones_trims_and_drops_empty() {
        let phones = vec![
            " 2-222-222 ".to_string(),
            String::new(),
            "3-333-333".to_string(),
            "8-923-666-13-13".to_string(),
        ];
        assert_eq!(join_phones(&phones), "2-222-222,3-333-333,8-923-666-13-13");
    }

    #[test]
    fn test_join_phones_empty() {
        assert_eq!(join_phones(&[]), "");
    }

    #[test]
    fn test_fold_name_lowercases_ascii() {
        assert_eq!(fold_name("Horns and Hooves LLC"), "horns and hooves llc");
        assert!(fold_name("Horns and Hooves LLC").contains(&fold_name("HOOVES")));
    }

    #[test]
    fn test_fold_name_folds_cyrillic() {
        assert_eq!(fold_name("ООО Рога и Копыта"), "ооо рога и копыта");
        assert!(fold_name("ООО Рога и Копыта").contains(&fold_name("КОПЫТА")));
    }

    #[test]
    fn test_fold_name_keeps_wildcards() {
        assert_eq!(fold_name("100% Auto_Parts"), "100% auto_parts");
    }

    #[test]
    fn test_organization_row_into_details() {
        let row = OrganizationRow {
            id: 3,
            name: "Milk Farm".to_string(),
            phones: "1-111".to_string(),
            building_id: 9,
            address: "Field road 1".to_string(),
            lat: Some(1.5),
            lon: None,
        };
        let details = row.into_details(vec![Activity {
            id: 2,
            name: "Dairy".to_string(),
            parent_id: Some(1),
        }]);

        assert_eq!(details.building.id, 9);
        assert_eq!(details.building.lat, Some(1.5));
        assert_eq!(details.activities.len(), 1);
    }
}
