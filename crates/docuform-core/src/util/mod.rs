//! Name and key utilities.

pub mod names;
