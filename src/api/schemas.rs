//! Request/response schema module.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

use crate::models::{Activity, Building, OrganizationDetails};

const fn default_tree_depth() -> i64 {
    3
}

fn validate_finite(value: f64) -> Result<(), ValidationError> {
    if value.is_finite() {
        Ok(())
    } else {
        let mut error = ValidationError::new("finite");
        error.message = Some("value must be a finite number".into());
        Err(error)
    }
}

/// Query for the location search.
#[derive(Debug, Clone, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LocationQuery {
    /// Latitude of the search center
    #[validate(custom(function = "validate_finite"))]
    pub lat: f64,

    /// Longitude of the search center
    #[validate(custom(function = "validate_finite"))]
    pub lon: f64,

    /// Search radius in coordinate units, must be greater than 0
    #[validate(
        custom(function = "validate_finite"),
        range(exclusive_min = 0.0, message = "radius must be greater than 0")
    )]
    pub radius: f64,
}

/// Query for the name search.
#[derive(Debug, Clone, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct NameQuery {
    /// Substring to look for, case-insensitive
    #[validate(length(max = 255, message = "name must be at most 255 characters"))]
    pub name: String,
}

/// Query for the activity subtree search.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ActivitySearchQuery {
    /// Activity whose subtree (two levels down) is searched
    pub activity_id: i64,
}

/// Query for the activity tree listing.
#[derive(Debug, Clone, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TreeQuery {
    /// Number of levels to include, roots counting as the first; `<= 0` yields nothing
    #[serde(default = "default_tree_depth")]
    #[param(default = 3, maximum = 10)]
    #[validate(range(max = 10, message = "max_depth must be at most 10"))]
    pub max_depth: i64,
}

/// Building as exposed by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BuildingOut {
    pub id: i64,
    pub address: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

impl From<Building> for BuildingOut {
    fn from(building: Building) -> Self {
        Self {
            id: building.id,
            address: building.address,
            lat: building.lat,
            lon: building.lon,
        }
    }
}

/// Activity as exposed by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ActivityOut {
    pub id: i64,
    pub name: String,
    pub parent_id: Option<i64>,
}

impl From<Activity> for ActivityOut {
    fn from(activity: Activity) -> Self {
        Self {
            id: activity.id,
            name: activity.name,
            parent_id: activity.parent_id,
        }
    }
}

/// Organization with its building and activities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OrganizationOut {
    pub id: i64,
    pub name: String,
    /// Comma-separated phone numbers
    pub phones: String,
    pub building: BuildingOut,
    pub activities: Vec<ActivityOut>,
}

impl From<OrganizationDetails> for OrganizationOut {
    fn from(details: OrganizationDetails) -> Self {
        Self {
            id: details.id,
            name: details.name,
            phones: details.phones,
            building: details.building.into(),
            activities: details.activities.into_iter().map(Into::into).collect(),
        }
    }
}

/// Converts a list of model rows into API objects.
pub fn organizations_out(details: Vec<OrganizationDetails>) -> Vec<OrganizationOut> {
    details.into_iter().map(Into::into).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    fn location(lat: f64, lon: f64, radius: f64) -> LocationQuery {
        LocationQuery { lat, lon, radius }
    }

    #[test]
    fn test_location_query_valid() {
        assert!(location(55.75, 37.61, 0.5).validate().is_ok());
    }

    #[test]
    fn test_location_query_rejects_zero_radius() {
        assert!(location(55.75, 37.61, 0.0).validate().is_err());
    }

    #[test]
    fn test_location_query_rejects_negative_radius() {
        assert!(location(55.75, 37.61, -1.0).validate().is_err());
    }

    #[test]
    fn test_location_query_rejects_non_finite() {
        assert!(location(f64::NAN, 37.61, 1.0).validate().is_err());
        assert!(location(55.75, f64::INFINITY, 1.0).validate().is_err());
        assert!(location(55.75, 37.61, f64::INFINITY).validate().is_err());
    }

    #[test]
    fn test_validate_finite() {
        assert!(validate_finite(0.0).is_ok());
        assert!(validate_finite(-90.0).is_ok());
        assert!(validate_finite(f64::NAN).is_err());
        assert!(validate_finite(f64::NEG_INFINITY).is_err());
    }

    #[test]
    fn test_location_query_deserialize() {
        let query: LocationQuery =
            serde_json::from_str(r#"{"lat": 1.0, "lon": 2.5, "radius": 3}"#).unwrap();
        assert!((query.radius - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_tree_query_default_depth() {
        let query: TreeQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.max_depth, 3);
    }

    #[test]
    fn test_tree_query_bounds() {
        assert!(TreeQuery { max_depth: 0 }.validate().is_ok());
        assert!(TreeQuery { max_depth: 10 }.validate().is_ok());
        assert!(TreeQuery { max_depth: 11 }.validate().is_err());
    }

    #[test]
    fn test_tree_query_accepts_negative_depth() {
        assert!(TreeQuery { max_depth: -1 }.validate().is_ok());
    }

    #[test]
    fn test_name_query_length_limit() {
        let ok = NameQuery {
            name: "a".repeat(255),
        };
        let too_long = NameQuery {
            name: "a".repeat(256),
        };
        assert!(ok.validate().is_ok());
        assert!(too_long.validate().is_err());
    }

    #[test]
    fn test_organization_out_from_details() {
        let details = OrganizationDetails {
            id: 1,
            name: "Horns and Hooves LLC".to_string(),
            phones: "2-222-222,3-333-333".to_string(),
            building: Building {
                id: 4,
                address: "Lenina 1".to_string(),
                lat: Some(55.0),
                lon: Some(37.0),
            },
            activities: vec![Activity {
                id: 2,
                name: "Meat products".to_string(),
                parent_id: Some(1),
            }],
        };

        let out = OrganizationOut::from(details);
        let json = serde_json::to_value(&out).unwrap();

        assert_eq!(json["building"]["id"], 4);
        assert_eq!(json["phones"], "2-222-222,3-333-333");
        assert_eq!(json["activities"][0]["parent_id"], 1);
    }

    #[test]
    fn test_activity_out_root_has_null_parent() {
        let out = ActivityOut::from(Activity {
            id: 1,
            name: "Food".to_string(),
            parent_id: None,
        });
        let json = serde_json::to_value(&out).unwrap();
        assert!(json["parent_id"].is_null());
    }
}
