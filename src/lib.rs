//! Compiles declarative resource, special-permission and role definitions
//! into a flat permission catalog and role assignments, syncs them into a
//! store and renders permission names as human labels.

pub mod app;
pub mod authz;
pub mod catalog;
pub mod config;
pub mod db;
pub mod definition;
pub mod docs;
pub mod errors;
pub mod grouping;
pub mod manager;
pub mod roles;
pub mod routes;
pub mod store;
pub mod syncer;
pub mod translator;

pub use app::{create_app, AppState};
pub use catalog::PermissionCatalog;
pub use definition::{DefinitionValue, ResourceDefinitions, RoleDefinitions, SpecialDefinitions};
pub use manager::PermissionManager;
pub use syncer::{PermissionSyncer, RoleOutcome, SyncReport};
pub use translator::{Dictionary, LangDictionary, Translator};
