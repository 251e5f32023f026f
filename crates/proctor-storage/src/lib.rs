// Postgres persistence for the session state store
//
// Implements proctor_core::SessionRepository over a single document-style
// table. Integration against a live database is exercised in deployment;
// unit tests cover the row conversions.

pub mod models;
pub mod postgres;

pub use models::SessionRow;
pub use postgres::PgSessionRepository;
