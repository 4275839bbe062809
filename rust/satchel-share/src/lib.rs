#![warn(missing_docs)]

//! Share links for stored files.
//!
//! A share link is a [Capability]: an unguessable id that grants anonymous,
//! read-only access to one file until it expires or its owner revokes it.
//! Resolving a link never reveals where the file is stored; the visitor
//! gets the file's public metadata and a short-lived read credential minted
//! by the object store.
//!
//! The pieces:
//!
//! - [CapabilityStore] persists capabilities, with a document-backed
//!   implementation in [DocumentCapabilityStore]
//! - [Lifecycle] creates, revokes, counts and lists them
//! - [authorize] is the ownership gate every mutation passes through
//! - [Cascade] retires the capabilities of a deleted file
//! - [Resolver] turns a capability id into a [Resolution]
//! - [Library] manages the files themselves
//! - [Sweeper] reclaims capabilities that can no longer resolve
//! - [ShareLinks] derives the public URL of a capability
//!
//! All of them are built from one set of [Handles].

mod error;
pub use error::*;

mod identity;
pub use identity::*;

mod capability;
pub use capability::*;

mod file;
pub use file::*;

mod store;
pub use store::*;

mod handles;
pub use handles::*;

mod gate;
pub use gate::*;

mod lifetime;
pub use lifetime::*;

mod lifecycle;
pub use lifecycle::*;

mod cascade;
pub use cascade::*;

mod access;
pub use access::*;

mod library;
pub use library::*;

mod sweep;
pub use sweep::*;

mod link;
pub use link::*;

#[cfg(any(test, feature = "helpers"))]
mod helpers;
#[cfg(any(test, feature = "helpers"))]
pub use helpers::*;
