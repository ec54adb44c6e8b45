/// Service catalog reads and queue lengths.
pub mod catalog_service;
/// Next-ticket selection for counters.
pub mod dispatch_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Catalog seeding and queue rebuild when storage comes online.
pub mod recovery;
/// Bridge from queue events to display clients.
pub mod sse_events;
/// Server-Sent Events streaming.
pub mod sse_service;
/// Storage connection supervisor and degraded mode.
pub mod storage_supervisor;
/// Ticket issuance.
pub mod ticket_service;
/// WebSocket display feed.
pub mod websocket_service;
