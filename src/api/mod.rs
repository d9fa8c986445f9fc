//! API Module
//!
//! HTTP handlers and routing for the cache admin REST API.
//!
//! # Endpoints
//! - `PUT /set` - Store a JSON value
//! - `GET /get/:key` - Retrieve a value by key
//! - `DELETE /del/:key` - Delete a key
//! - `GET /ttl/:key` - Remaining TTL
//! - `POST /expire/:key` - Reset TTL
//! - `GET /keys` / `DELETE /keys` - Pattern listing and deletion
//! - `DELETE /flush` - Clear the cache
//! - `GET /stats` - Cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
