//! Arcadia game library engine.
//!
//! This crate builds the library layer on top of `arcadia-core`:
//!
//! - **Categories**: Named, saved searches over the game library
//! - **Category Editor**: The save and delete rules for one category
//! - **Library Events**: Notification sources fired after every change
//! - **Configuration**: Category naming rules loaded from TOML
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use arcadia::{CategoryConfig, InMemoryCategoryStore, Library};
//! use arcadia_core::MainLoop;
//!
//! let main_loop = MainLoop::new();
//! let library = Library::new(
//!     Arc::new(InMemoryCategoryStore::new()),
//!     main_loop.scheduler(),
//!     CategoryConfig::default(),
//! );
//!
//! library.events().categories_changed.register(|change| {
//!     println!("categories changed: {change:?}");
//! });
//!
//! let mut editor = library.new_category_editor();
//! editor.save("Point and Click", "genre:adventure")?;
//!
//! // Subscribers hear about it once the loop is idle.
//! main_loop.run_until_idle()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod category;
pub mod config;
mod error;
pub mod events;
mod library;

pub use category::{
    Category, CategoryEditor, CategoryId, CategoryStore, DeletePrompt, InMemoryCategoryStore,
    SaveOutcome, is_reserved_category, normalize_search, strip_category_name,
};
pub use config::CategoryConfig;
pub use error::{CategoryError, ConfigError, Result, StoreError};
pub use events::{CategoryChange, LibraryEvents};
pub use library::Library;
