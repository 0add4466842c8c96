//! ## Intro
//!
//! A vector whose first `N` elements live in storage embedded inside the vector
//! object, falling back to the heap once it grows past `N`.
//!
//! Many hot paths build small, short-lived sequences where the cost of the heap
//! allocation dominates the work done with the data. `EmbedVec` keeps those on the
//! stack (or wherever its owner lives) and only pays for a heap allocation when the
//! sequence actually gets large.
//!
//! ## Design
//!
//! The crate is split into an allocator and the container that drives it.
//!
//! ### `EmbeddedAllocator`
//!
//! - **Embedded region** of `N` slots and a bump **cursor**
//! - Requests that fit behind the cursor are carved from the region
//! - Everything else is forwarded, whole, to a [`HeapAlloc`]
//! - Releases are **stack-like**: only the tail block rewinds the cursor,
//!   other embedded releases are ignored
//!
//! ### `EmbedVec`
//!
//! - Activates its allocator and reserves exactly `N` slots on construction
//! - **Vec-like** interface
//! - Only capacity changes call the allocator: new block, move, release old block
//!
//! ```
//! # use embedvec::{EmbedVec, embedvec};
//! let mut vec: EmbedVec<i32, 5> = embedvec![1, 2, 3];
//! assert!(vec.is_embedded());
//!
//! // Push beyond capacity, the data moves to the heap
//! vec.extend([4, 5, 6, 7, 8]);
//! assert!(!vec.is_embedded());
//!
//! // and the embedded region is free again.
//! assert_eq!(vec.allocator().cursor(), Some(0));
//! ```
//!
//! ## Counting heap calls
//!
//! [`heap::Tracked`] wraps the fallback heap and counts every delegated call,
//! see the [`heap`] module.
//!
//! ## `no_std` support
//!
//! This crate requires only `core` and `alloc`.
//!
//! ## Optional features
//!
//! ### `std`
//!
//! Implements [`std::io::Write`] for `EmbedVec<u8, N, H>`.
//!
//! ### `serde`
//!
//! When this optional dependency is enabled,
//! [`EmbedVec`] implements the [`serde::Serialize`] and [`serde::Deserialize`] traits.
//!
//! [`serde::Serialize`]: https://docs.rs/serde/latest/serde/trait.Serialize.html
//! [`serde::Deserialize`]: https://docs.rs/serde/latest/serde/trait.Deserialize.html
//! [`std::io::Write`]: https://doc.rust-lang.org/std/io/trait.Write.html
#![no_std]

extern crate alloc;

mod utils;

pub mod error;
#[doc(inline)]
pub use error::Error;

pub mod heap;
#[doc(inline)]
pub use heap::{Global, HeapAlloc};

pub mod embedded_alloc;
#[doc(inline)]
pub use embedded_alloc::{Block, EmbeddedAllocator};

pub mod embed_vec;
#[doc(inline)]
pub use embed_vec::EmbedVec;

#[cfg(feature = "serde")]
mod serde;

#[cfg(feature = "std")]
mod std_io;

/// A small `EmbedVec` with 8 embedded slots.
///
/// # Examples
///
/// ```
/// # use embedvec::MiniVec;
/// let mut vec: MiniVec<i32> = MiniVec::new();
///
/// vec.extend([1, 2, 3]);
/// assert!(vec.is_embedded());
///
/// vec.extend([4, 5, 6, 7, 8, 9]);
/// assert!(!vec.is_embedded());
/// assert_eq!(vec.len(), 9);
/// ```
pub type MiniVec<T> = EmbedVec<T, 8>;
