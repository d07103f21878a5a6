//! HTTP handler functions for the cycle parking API.

use actix_web::{HttpResponse, web};
use cycle_parking_database::{ConnectionPool, DbError, ParkingStore};
use cycle_parking_database_models::ParkingQuery;
use cycle_parking_models::{ParkingLocation, to_feature_collection};
use cycle_parking_server_models::{ApiError, ApiHealth, ParkingQueryParams};

use crate::AppState;

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/parking`
///
/// Returns a `GeoJSON` `FeatureCollection` of parking locations inside
/// `bounds`, nearest to `lat`/`lon`, or the first rows when neither is
/// given.
pub async fn parking(
    state: web::Data<AppState>,
    params: web::Query<ParkingQueryParams>,
) -> HttpResponse {
    let query = match params.to_query(&state.limits) {
        Ok(query) => query,
        Err(e) => {
            log::debug!("Rejected parking query {params:?}: {e}");
            return HttpResponse::BadRequest().json(ApiError::bad_request(e.to_string()));
        }
    };

    match fetch_locations(&state.pool, &query).await {
        Ok(locations) => {
            log::debug!("Returning {} parking locations", locations.len());
            HttpResponse::Ok().json(to_feature_collection(&locations))
        }
        Err(e) => {
            log::error!("Error fetching parking data: {e}");
            HttpResponse::InternalServerError().json(ApiError::internal())
        }
    }
}

/// Runs `query` on a pooled connection.
///
/// The connection guard is dropped before this returns on every path.
async fn fetch_locations(
    pool: &ConnectionPool<Box<dyn ParkingStore>>,
    query: &ParkingQuery,
) -> Result<Vec<ParkingLocation>, DbError> {
    let rows = {
        let conn = pool.acquire().await?;
        conn.query_parking(query).await?
    };

    let limit = usize::try_from(query.limit()).unwrap_or(usize::MAX);

    Ok(rows
        .into_iter()
        .filter_map(|row| {
            let id = row.feature_id.clone();
            row.into_location()
                .map_err(|e| log::warn!("Skipping parking row {id}: {e}"))
                .ok()
        })
        .take(limit)
        .collect())
}
