//! HTTP server layer for the resize proxy.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │                GET /?url=<source>&width=<pixels>                │
//! │                                                                 │
//! │  ┌───────────────────────────┐  ┌───────────────────────────┐   │
//! │  │         handlers          │  │          routes           │   │
//! │  │ (requests, error mapping) │  │  (router, CORS, tracing)  │   │
//! │  └───────────────────────────┘  └───────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod handlers;
pub mod routes;

pub use handlers::{
    health_handler, resize_handler, AppState, ErrorResponse, HealthResponse, CACHE_HIT_HEADER,
    INTERNAL_ERROR_MESSAGE,
};
pub use routes::{create_router, RouterConfig};
