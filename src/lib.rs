//! Change tracking and cascading denormalization for document stores.
//!
//! Documents describe their fields through [`record::Record`], which lets
//! [`diff`] report which dotted paths changed since the last load or save.
//! On save and delete a document may declare [`cascade::CascadeConfig`]s;
//! the [`runtime`] pipeline turns them into plans and applies them on a
//! background task, copying the document's fields into related documents
//! and clearing stale copies when a relation moves.
//!
//! # Examples
//!
//! Change detection on a standalone record:
//! ```
//! use denorm::{
//!     diff::DiffTracker,
//!     record::{Field, FieldSet, Record},
//! };
//!
//! struct City {
//!     name: String,
//!     population: u64,
//! }
//!
//! impl Record for City {
//!     fn type_name(&self) -> &'static str {
//!         "City"
//!     }
//!     fn describe(&self, fields: &mut FieldSet) {
//!         fields
//!             .leaf(Field::named("name"), &self.name)
//!             .leaf(Field::new("population", "pop"), &self.population);
//!     }
//! }
//!
//! let mut city = City { name: "Oslo".into(), population: 700_000 };
//! let mut tracker = DiffTracker::new("City");
//! assert!(tracker.modified(&city, "name").expect("attached"));
//!
//! tracker.set_original(&city).expect("same type");
//! city.population += 1;
//! assert!(tracker.modified(&city, "population").expect("attached"));
//! assert!(!tracker.modified(&city, "name").expect("attached"));
//! ```
//!
//! Saving through a database:
//! ```no_run
//! use denorm::{
//!     document::{Document, DocumentMeta},
//!     diff::Trackable,
//!     record::{Field, FieldSet, Record},
//!     registry::{DocumentSchema, SchemaRegistry},
//!     runtime::{Database, DatabaseConfig},
//! };
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Default, Serialize, Deserialize)]
//! struct Note {
//!     #[serde(flatten)]
//!     meta: DocumentMeta,
//!     text: String,
//! }
//!
//! impl Record for Note {
//!     fn type_name(&self) -> &'static str {
//!         Self::TYPE_NAME
//!     }
//!     fn describe(&self, fields: &mut FieldSet) {
//!         fields
//!             .record(Field::inline("meta"), &self.meta)
//!             .leaf(Field::named("text"), &self.text);
//!     }
//! }
//!
//! impl Trackable for Note {}
//!
//! impl Document for Note {
//!     const TYPE_NAME: &'static str = "Note";
//!     fn schema() -> DocumentSchema {
//!         DocumentSchema::new("notes")
//!     }
//!     fn meta(&self) -> &DocumentMeta {
//!         &self.meta
//!     }
//!     fn meta_mut(&mut self) -> &mut DocumentMeta {
//!         &mut self.meta
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() {
//! let mut registry = SchemaRegistry::new();
//! registry.register::<Note>().expect("register");
//! let db = Database::open(&DatabaseConfig::default(), registry).expect("open");
//! let notes = db.collection::<Note>().expect("registered");
//! let mut note = Note { text: "hello".into(), ..Note::default() };
//! notes.save(&mut note).await.expect("save").detach();
//! # }
//! ```
#![warn(missing_docs)]

/// Propagation of denormalized copies.
pub mod cascade;
/// Structural diffing and per-document change tracking.
pub mod diff;
/// Document trait, identity fields and lifecycle hooks.
pub mod document;
/// Tracing subscriber setup.
pub mod logging;
/// Dotted-path helpers over JSON values.
pub mod path;
/// Document storage backends.
pub mod persist;
/// Field descriptions and snapshots.
pub mod record;
/// Schema registry.
pub mod registry;
/// Save/delete/find pipeline and cascade events.
pub mod runtime;
/// Shared primitive types and enums.
pub mod types;
/// Validation predicates.
pub mod validate;
