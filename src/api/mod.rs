//! HTTP API Handlers and Routes
//!
//! The REST layer for ares-research, built on the Axum web framework.
//!
//! # Module Structure
//!
//! - [`api::handlers`](crate::api::handlers) - Request handlers for each endpoint
//! - [`api::routes`](crate::api::routes) - Route definitions and router configuration
//!
//! # API Endpoints
//!
//! - `POST /api/chat` - Research the last user message and stream the answer
//!   (`x-vercel-ai-data-stream: v1`)
//! - `GET /health` - Health check endpoint
//!
//! # OpenAPI Documentation
//!
//! When the `swagger-ui` feature is enabled, interactive API documentation
//! is available at `/swagger-ui/`.

use utoipa::OpenApi;

/// Request and response handlers for all API endpoints.
pub mod handlers;
/// Router configuration and route definitions.
pub mod routes;

/// OpenAPI document for the HTTP API
#[derive(OpenApi)]
#[openapi(
    paths(handlers::chat::chat, handlers::chat::health),
    components(schemas(crate::types::ChatRequest, crate::types::IncomingMessage)),
    tags(
        (name = "chat", description = "Multi-question research chat"),
        (name = "health", description = "Liveness")
    )
)]
pub struct ApiDoc;
