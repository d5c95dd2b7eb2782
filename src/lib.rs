#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

/// The file-descriptor table itself.
///
/// This module provides [`FdTable`], its [`Cursor`] and [`Iter`], and, with
/// the `stats` feature, diagnostics about slot utilisation.
pub mod fd_table;

pub mod hasher;

pub mod slot_alloc;


pub use fd_table::Cursor;
pub use fd_table::FdTable;
pub use fd_table::Iter;
#[cfg(feature = "foldhash")]
pub use hasher::FoldKeyHasher;
pub use hasher::IdentityHasher;
pub use hasher::KeyHasher;
pub use slot_alloc::AllocError;
