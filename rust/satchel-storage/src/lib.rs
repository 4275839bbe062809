#![warn(missing_docs)]

//! Storage plumbing for Satchel.
//!
//! Metadata documents live in a [DocumentBackend]: a key/value substrate where
//! every write is a compare-and-swap against the edition the writer last saw.
//! A [Collection] layers a typed, encoded view on top of it. File bytes live
//! in an [ObjectStore], which can also mint short-lived read URLs.
//!
//! ```rust
//! use satchel_storage::{Collection, Document, MemoryBackend};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
//! struct Note {
//!     id: String,
//!     text: String,
//! }
//!
//! impl Document for Note {
//!     const COLLECTION: &'static str = "notes";
//!     fn id(&self) -> &str {
//!         &self.id
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), satchel_storage::SatchelStorageError> {
//! let notes = Collection::<Note, _>::new(MemoryBackend::default());
//! let note = Note { id: "a".into(), text: "hello".into() };
//! notes.create(&note).await?;
//! assert_eq!(notes.get("a").await?, Some(note));
//! # Ok(())
//! # }
//! ```

mod error;
pub use error::*;

mod encoder;
pub use encoder::*;

mod backend;
pub use backend::*;

mod collection;
pub use collection::*;

mod object;
pub use object::*;

#[cfg(any(test, feature = "helpers"))]
mod helpers;
#[cfg(any(test, feature = "helpers"))]
pub use helpers::*;
