//! API Module
//!
//! HTTP handlers and routing for the cache server.
//!
//! # Endpoints
//! - `POST /set` - Store a key-value pair with a TTL
//! - `GET /get?key=` - Retrieve a value by key
//! - `GET /delete?key=` - Delete a key
//! - `GET /cacheUpdates` - WebSocket feed of full cache snapshots
//! - `GET /stats` - Get cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;
pub mod ws;

pub use handlers::*;
pub use routes::create_router;
