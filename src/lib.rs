//! # Canopy
//!
//! A hierarchical configuration store for Rust applications, inspired by
//! Commons Configuration.
//!
//! Canopy keeps properties in a node tree and addresses them with dot-path
//! keys resolved by a pluggable expression engine. It supports:
//!
//! - Hierarchical keys with indexed access to same-named siblings
//! - Live sub-views rooted at any node of the tree
//! - Automatic detachment of sub-views whose key stops resolving
//! - List splitting of delimited string values
//! - Flat key-value sources with mutation events
//!
//! ## Architecture Overview
//!
//! A [`Canopy`] is the root configuration: it owns the node tree, the
//! expression engine and the global settings. [`SubView`]s created with
//! [`Canopy::configuration_at`] share that state and resolve keys relative
//! to their node, staying consistent with mutations made anywhere else on
//! the tree. A sub-view whose key can no longer be resolved to a single
//! node detaches permanently and keeps serving the last known snapshot of
//! its subtree.
//!
//! Alongside the tree there is a flat world: [`FlatSource`] is a plain
//! key-value store, and [`EventedSource`] decorates any source with paired
//! before/after mutation events delivered to registered listeners.
//!
//! ## Quick Start
//!
//! ```rust
//! use canopy::{Canopy, ConfigValue};
//!
//! let config = Canopy::new();
//!
//! // Build up a small table layout
//! config.add_property("tables.table(-1).name", ConfigValue::from("users")).unwrap();
//! config.add_property("tables.table(0).fields.field(-1).name", ConfigValue::from("uid")).unwrap();
//!
//! // Read through the root
//! let name = config.get_string("tables.table(0).name").unwrap();
//! assert_eq!(name, Some("users".to_string()));
//!
//! // Or through a live sub-view
//! let table = config.configuration_at("tables.table(0)").unwrap();
//! let field = table.get_string("fields.field(0).name").unwrap();
//! assert_eq!(field, Some("uid".to_string()));
//! ```
//!
//! ## Keys
//!
//! Keys are sequences of node names separated by the engine's delimiter
//! (`.` by default). A segment may carry an index to pick one of several
//! same-named siblings, `(-1)` marks a branch point when adding, and a
//! trailing `[@name]` addresses an attribute:
//!
//! ```text
//! tables.table(1).name      second table's name node
//! tables.table(-1).name     add: start a new table branch
//! tables.table(0)[@type]    attribute on the first table
//! ```
//!
//! ## Sub-View Detachment
//!
//! A sub-view re-resolves its key whenever the tree changed underneath it,
//! adopting whatever single node the key now selects. If the key no longer
//! selects exactly one node, or the engine can no longer evaluate it, the
//! view detaches for good:
//!
//! ```rust
//! use canopy::{Canopy, ConfigValue};
//!
//! let config = Canopy::new();
//! config.add_property("server.host", ConfigValue::from("localhost")).unwrap();
//!
//! let server = config.configuration_at("server").unwrap();
//! config.clear_tree("server").unwrap();
//!
//! // the view answers from its frozen snapshot
//! assert!(!server.is_attached());
//! assert_eq!(server.get_string("host").unwrap(), Some("localhost".to_string()));
//! ```
//!
//! ## Mutation Events
//!
//! ```rust
//! use std::rc::Rc;
//! use canopy::{ConfigValue, EventedSource, FlatSource, MapSource, SourceEvent, SourceListener};
//!
//! struct Printer;
//!
//! impl SourceListener for Printer {
//!     fn source_changed(&self, event: &SourceEvent) {
//!         println!("{:?} before={}", event.kind, event.before_update);
//!     }
//! }
//!
//! let mut source = EventedSource::new(Box::new(MapSource::new()));
//! source.add_listener(Rc::new(Printer));
//! source.set_property("mode", ConfigValue::from("fast")).unwrap();
//! ```
//!
//! ## Error Handling
//!
//! All fallible operations return `ConfigResult<T>`, an alias for
//! `Result<T, ConfigError>`:
//!
//! ```rust
//! use canopy::{Canopy, ConfigError};
//!
//! let config = Canopy::new();
//! config.set_throw_exception_on_missing(true);
//! match config.get_string("nonexistent.key") {
//!     Ok(Some(value)) => println!("Value: {}", value),
//!     Ok(None) => println!("Key not found"),
//!     Err(ConfigError::KeyNotFound { key }) => println!("Key '{}' not found", key),
//!     Err(e) => println!("Error: {}", e),
//! }
//! ```

pub mod capability;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod handler;
pub mod node;
pub mod source;
pub mod subview;
pub mod value;
pub mod wrapper;

mod access;

// Re-export main types for convenience
pub use capability::Capabilities;
pub use config::{Canopy, Settings};
pub use engine::{AddData, DotExpressionEngine, ExpressionEngine, QueryResult};
pub use error::{ConfigError, ConfigResult};
pub use event::{EventKind, ListenerRegistry, SourceEvent, SourceListener};
pub use handler::{NodeHandler, TreeHandler};
pub use node::{NodeId, NodeTree};
pub use source::{FlatSource, FlatSourceExt, MapSource};
pub use subview::SubView;
pub use value::{split_list, ConfigValue};
pub use wrapper::EventedSource;
