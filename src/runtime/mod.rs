//! Save, delete and find pipeline over a document store.

mod collection;
mod database;
mod error;
/// Cascade progress events.
pub mod events;

pub use collection::Collection;
pub use database::{Database, DatabaseConfig};
pub use error::OdmError;
