// Library root for the ranking core: domain types, the personal ranking
// editor, catalog search, consensus aggregation, and the storage backends.

pub mod aggregate;
pub mod catalog;
pub mod config;
pub mod db;
pub mod editor;
pub mod error;
pub mod hosted;
pub mod model;
pub mod protocol;
pub mod seed;
pub mod session;
pub mod store;
