// Copyright (c) 2018 Fabian Schuiki

//! A scannerless generalized LR parser driven by precompiled SDF2 parse tables.
//!
//! Tables are decoded from their ATerm representation by [`read`], yielding an
//! immutable [`table::ParseTable`]. The [`glr`] runtime executes the table
//! directly over the characters of the input and produces a [`forest`] that
//! holds every derivation that survives disambiguation. The [`implode`] module
//! turns such a forest into an abstract syntax term.

#![deny(missing_docs)]

pub mod codepoint;
pub mod forest;
pub mod glr;
pub mod implode;
pub mod input;
pub mod read;
pub mod stack;
pub mod symbol;
pub mod table;

pub use sglr_aterm as aterm;

/// A pretty printer.
pub struct Pretty<C, T> {
    ctx: C,
    item: T,
}

impl<C, T> Pretty<C, T> {
    pub(crate) fn new(ctx: C, item: T) -> Pretty<C, T> {
        Pretty { ctx, item }
    }
}
