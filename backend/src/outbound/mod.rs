//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **persistence**: `UserStore` over PostgreSQL (Diesel) or process memory
//! - **registry**: `ServiceRegistry` over Redis or process memory
//! - **token**: `TokenIssuer` signing HS256 JWTs
//!
//! Adapters translate between domain types and infrastructure
//! representations. They contain no business logic.

pub mod persistence;
pub mod registry;
pub mod token;
