pub mod audit;
pub mod auth;
pub mod bulk;
pub mod dashboard;
pub mod exports;
pub mod forests;
pub mod health;
pub mod realtime;
pub mod trees;
pub mod uploads;
pub mod users;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/register                         register (public)
/// /auth/login                            login (public)
/// /auth/refresh                          refresh (public)
/// /auth/logout                           logout (requires auth)
/// /auth/me                               own profile (requires auth)
///
/// /forests                               list, create (create: admin)
/// /forests/{id}                          get, update, delete (mutations: admin)
///
/// /trees                                 list, create (create: admin)
/// /trees/{id}                            get, update, delete (mutations: admin)
/// /trees/{id}/measurements               list, append
/// /trees/{id}/measurements/latest        latest measurement
///
/// /bulk/trees/create                     batch insert (POST)
/// /bulk/trees/update                     batch update (PUT)
/// /bulk/trees/delete                     batch soft/hard delete (DELETE)
/// /bulk/measurements/add                 batch measurement append (POST)
/// /bulk/operations/status                last-24h bulk summary (GET)
///
/// /uploads/trees/{id}/images             upload (multipart), list
/// /uploads/images/{id}                   delete (uploader or admin)
///
/// /users                                 list, create (admin only)
/// /users/{id}                            get, update, deactivate (admin only)
/// /users/{id}/reset-password             reset password (admin only)
///
/// /audit                                 query (admin only)
/// /audit/export                          CSV/JSON export (admin only)
///
/// /dashboard/overview                    counters (GET)
/// /dashboard/species                     species distribution (GET)
/// /dashboard/health                      health distribution (GET)
/// /dashboard/heights                     latest height per tree (GET)
/// /dashboard/forests                     forest comparison (GET)
///
/// /exports/trees.csv                     filtered tree export (GET)
/// /exports/trees/{id}/measurements.csv   measurement export (GET)
///
/// /realtime/events                       SSE stream (GET)
/// /realtime/ws                           WebSocket upgrade (GET)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/forests", forests::router())
        .nest("/trees", trees::router())
        .nest("/bulk", bulk::router())
        .nest("/uploads", uploads::router())
        .nest("/users", users::router())
        .nest("/audit", audit::router())
        .nest("/dashboard", dashboard::router())
        .nest("/exports", exports::router())
        .nest("/realtime", realtime::router())
}
