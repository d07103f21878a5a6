//! Spatial queries against the `cycle_parking` table.
//!
//! Queries use `query_raw_params()` with `PostGIS` operators so the GIST
//! index on `location` serves both the bounding box filter (`&&`) and the
//! nearest-neighbour ordering (`<->`).

use std::fmt::Write as _;

use cycle_parking_database_models::{ParkingQuery, ParkingRow};
use cycle_parking_models::{Amenity, ParkingAmenities};
use moosicbox_json_utils::database::ToValue as _;
use switchy_database::{Database, DatabaseValue, Row};

use crate::{DbError, ParkingStore};

const BASE_COLUMNS: &str = "feature_id, borough, prk_cpt, photo1_url,
                ST_X(location) AS longitude, ST_Y(location) AS latitude";

/// Builds the SQL text and bind parameters for a [`ParkingQuery`].
#[must_use]
pub fn build_parking_sql(query: &ParkingQuery) -> (String, Vec<DatabaseValue>) {
    let mut sql = format!("SELECT {BASE_COLUMNS}");

    if query.includes_details() {
        for amenity in Amenity::ALL {
            write!(sql, ", {}", amenity.column()).unwrap();
        }
        sql.push_str(", svdate::text AS svdate");
    }

    sql.push_str(" FROM cycle_parking");

    let mut params: Vec<DatabaseValue> = Vec::new();

    match query {
        ParkingQuery::Within { bbox, .. } => {
            sql.push_str(" WHERE location && ST_MakeEnvelope($1, $2, $3, $4, 4326)");
            params.push(DatabaseValue::Real64(bbox.west));
            params.push(DatabaseValue::Real64(bbox.south));
            params.push(DatabaseValue::Real64(bbox.east));
            params.push(DatabaseValue::Real64(bbox.north));
        }
        ParkingQuery::Nearest { point, .. } => {
            sql.push_str(" ORDER BY location <-> ST_SetSRID(ST_MakePoint($1, $2), 4326)");
            params.push(DatabaseValue::Real64(point.longitude));
            params.push(DatabaseValue::Real64(point.latitude));
        }
        ParkingQuery::Any { .. } => {}
    }

    write!(sql, " LIMIT ${}", params.len() + 1).unwrap();
    params.push(DatabaseValue::Int64(i64::from(query.limit())));

    (sql, params)
}

fn require_feature_id(value: Option<String>) -> Result<String, DbError> {
    value
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| DbError::Conversion {
            message: "cycle_parking row has no feature_id".to_string(),
        })
}

fn require_coordinate(
    feature_id: &str,
    column: &str,
    value: Option<f64>,
) -> Result<f64, DbError> {
    value.ok_or_else(|| DbError::Conversion {
        message: format!("cycle_parking row {feature_id} has no {column}"),
    })
}

fn row_to_parking(row: &Row, with_details: bool) -> Result<ParkingRow, DbError> {
    let feature_id = require_feature_id(row.to_value("feature_id").unwrap_or(None))?;
    let longitude = require_coordinate(
        &feature_id,
        "longitude",
        row.to_value("longitude").unwrap_or(None),
    )?;
    let latitude = require_coordinate(
        &feature_id,
        "latitude",
        row.to_value("latitude").unwrap_or(None),
    )?;

    let amenities = with_details.then(|| {
        Amenity::ALL
            .iter()
            .copied()
            .filter(|amenity| {
                let flag: Option<bool> = row.to_value(amenity.column()).unwrap_or(None);
                flag.unwrap_or(false)
            })
            .collect::<ParkingAmenities>()
    });

    Ok(ParkingRow {
        feature_id,
        longitude,
        latitude,
        borough: row.to_value("borough").unwrap_or(None),
        capacity: row.to_value("prk_cpt").unwrap_or(None),
        photo_url: row.to_value("photo1_url").unwrap_or(None),
        amenities,
        last_surveyed: if with_details {
            row.to_value("svdate").unwrap_or(None)
        } else {
            None
        },
    })
}

/// A [`ParkingStore`] backed by one `PostGIS` connection.
pub struct PostgisStore {
    db: Box<dyn Database>,
}

impl PostgisStore {
    /// Wraps an open database connection.
    #[must_use]
    pub fn new(db: Box<dyn Database>) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl ParkingStore for PostgisStore {
    async fn query_parking(&self, query: &ParkingQuery) -> Result<Vec<ParkingRow>, DbError> {
        let (sql, params) = build_parking_sql(query);
        log::debug!("Running parking query {query:?}");

        let rows = self.db.query_raw_params(&sql, &params).await?;
        let with_details = query.includes_details();

        rows.iter()
            .map(|row| row_to_parking(row, with_details))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use cycle_parking_database_models::BoundingBox;
    use cycle_parking_models::GeoPoint;

    use super::*;

    #[test]
    fn bbox_query_filters_by_envelope_with_details() {
        let bbox = BoundingBox::new(-0.1, 51.50, -0.08, 51.52).unwrap();
        let (sql, params) = build_parking_sql(&ParkingQuery::Within { bbox, limit: 2000 });

        assert!(sql.contains("location && ST_MakeEnvelope($1, $2, $3, $4, 4326)"));
        assert!(sql.contains("prk_hangar"));
        assert!(sql.contains("svdate::text AS svdate"));
        assert!(sql.ends_with("LIMIT $5"));
        assert!(!sql.contains("ORDER BY"));
        assert_eq!(params.len(), 5);
        assert!(matches!(params[4], DatabaseValue::Int64(2000)));
    }

    #[test]
    fn nearest_query_orders_by_distance() {
        let point = GeoPoint::new(-0.09, 51.505).unwrap();
        let (sql, params) = build_parking_sql(&ParkingQuery::Nearest { point, limit: 100 });

        assert!(sql.contains("ORDER BY location <-> ST_SetSRID(ST_MakePoint($1, $2), 4326)"));
        assert!(!sql.contains("prk_cover"));
        assert!(sql.ends_with("LIMIT $3"));
        assert!(matches!(params[0], DatabaseValue::Real64(lon) if (lon - -0.09).abs() < 1e-12));
        assert!(matches!(params[1], DatabaseValue::Real64(lat) if (lat - 51.505).abs() < 1e-12));
    }

    #[test]
    fn default_query_only_limits() {
        let (sql, params) = build_parking_sql(&ParkingQuery::Any { limit: 100 });

        assert!(!sql.contains("WHERE"));
        assert!(!sql.contains("ORDER BY"));
        assert!(sql.ends_with("FROM cycle_parking LIMIT $1"));
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn missing_or_blank_feature_id_is_a_conversion_error() {
        assert!(matches!(
            require_feature_id(None),
            Err(DbError::Conversion { .. })
        ));
        assert!(matches!(
            require_feature_id(Some("  ".to_string())),
            Err(DbError::Conversion { .. })
        ));
        assert_eq!(
            require_feature_id(Some("RWG1".to_string())).unwrap(),
            "RWG1"
        );
    }

    #[test]
    fn missing_coordinate_names_the_row() {
        let err = require_coordinate("RWG1", "latitude", None).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Data conversion error: cycle_parking row RWG1 has no latitude"
        );
        let latitude = require_coordinate("RWG1", "latitude", Some(51.5)).unwrap();
        assert!((latitude - 51.5).abs() < 1e-12);
    }
}
