// Configuration loading
pub mod config;

// Wire and domain data types
pub mod model;

// Top-N snapshot polling client
pub mod snapshot;

// Push channel (WebSocket client) and control protocol
pub mod channel;

// Subscription set reconciliation
pub mod reconcile;

// Keyed live-state store
pub mod store;

// Position/heading interpolation
pub mod animate;

// Poll/push orchestration
pub mod dashboard;
