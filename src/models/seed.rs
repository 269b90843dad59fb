//! Demo dataset for local runs and the container image.

use sqlx::SqlitePool;

use crate::error::AppResult;
use crate::models::activity::{ActivityRepository, NewActivity};
use crate::models::building::{BuildingRepository, NewBuilding};
use crate::models::organization::{NewOrganization, OrganizationRepository};

/// Inserts the demo directory unless organizations already exist.
///
/// Runs in a single transaction. Returns `true` when data was inserted.
pub async fn seed_demo_data(pool: &SqlitePool) -> AppResult<bool> {
    if OrganizationRepository::count(pool).await? > 0 {
        tracing::debug!("Directory already populated, skipping demo data");
        return Ok(false);
    }

    let mut tx = pool.begin().await?;

    let center = BuildingRepository::create(
        &mut *tx,
        &NewBuilding {
            address: "Moscow, Lenina 1, office 3".to_string(),
            lat: Some(55.7558),
            lon: Some(37.6173),
        },
    )
    .await?;
    let north = BuildingRepository::create(
        &mut *tx,
        &NewBuilding {
            address: "Moscow, Tverskaya 12".to_string(),
            lat: Some(55.7640),
            lon: Some(37.6056),
        },
    )
    .await?;
    let novosibirsk = BuildingRepository::create(
        &mut *tx,
        &NewBuilding {
            address: "Novosibirsk, Blyukhera 32/1".to_string(),
            lat: Some(54.9833),
            lon: Some(82.8964),
        },
    )
    .await?;

    let activity = |name: &str, parent_id: Option<i64>| NewActivity {
        name: name.to_string(),
        parent_id,
    };

    let food = ActivityRepository::create(&mut *tx, &activity("Food", None)).await?;
    let meat = ActivityRepository::create(&mut *tx, &activity("Meat products", Some(food.id))).await?;
    let dairy =
        ActivityRepository::create(&mut *tx, &activity("Dairy products", Some(food.id))).await?;
    let cars = ActivityRepository::create(&mut *tx, &activity("Cars", None)).await?;
    let trucks = ActivityRepository::create(&mut *tx, &activity("Trucks", Some(cars.id))).await?;
    let passenger =
        ActivityRepository::create(&mut *tx, &activity("Passenger cars", Some(cars.id))).await?;
    let parts =
        ActivityRepository::create(&mut *tx, &activity("Spare parts", Some(passenger.id))).await?;
    let accessories =
        ActivityRepository::create(&mut *tx, &activity("Accessories", Some(passenger.id))).await?;

    let organizations = [
        (
            "Horns and Hooves LLC",
            vec!["2-222-222", "3-333-333", "8-923-666-13-13"],
            center.id,
            vec![meat.id, dairy.id],
        ),
        (
            "Milk River Farm",
            vec!["8-800-555-35-35"],
            north.id,
            vec![dairy.id],
        ),
        (
            "Heavy Haulers",
            vec!["4-444-444"],
            novosibirsk.id,
            vec![trucks.id],
        ),
        (
            "Auto Detail Store",
            vec!["5-555-555", "6-666-666"],
            center.id,
            vec![parts.id, accessories.id],
        ),
    ];

    for (name, phones, building_id, activity_ids) in organizations {
        OrganizationRepository::create(
            &mut *tx,
            &NewOrganization {
                name: name.to_string(),
                phones: phones.into_iter().map(str::to_string).collect(),
                building_id,
                activity_ids,
            },
        )
        .await?;
    }

    tx.commit().await?;
    tracing::info!("Demo directory data inserted");

    Ok(true)
}
