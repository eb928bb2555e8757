// Financebook - Category Taxonomy & Payment Tagging Engine
// Exposes all modules for use in the CLI and tests

pub mod book;
pub mod config;
pub mod constants;
pub mod db;
pub mod descendants;    // Descendant closure over the tag forest
pub mod entities;
pub mod error;
pub mod import;         // Bulk import: parse → reconcile → materialize
pub mod names;          // Normalized-name policy
pub mod owners;
pub mod payments;
pub mod recipients;
pub mod tagging;        // One-tag-per-dimension + standard shortcut
pub mod taxonomy;

// Re-export commonly used types
pub use book::Book;
pub use config::Config;
pub use db::{
    append_event, events_for_entity, events_for_owner, open_database, setup_database, AuditEvent,
    EntityKind,
};
pub use entities::{
    Dimension, NewPaymentItem, NewTagNode, Owner, OwnerDefaults, PaymentFilter, PaymentItem,
    PaymentItemUpdate, Recipient, RecipientUpdate, TagNode, TagNodeUpdate, TagTree,
};
pub use error::{Error, Result, ValidationError};
pub use import::{ImportReport, ImportRow};
pub use names::normalize;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
