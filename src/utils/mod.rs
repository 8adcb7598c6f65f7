//! Small shared helpers: hashing and filesystem primitives.

pub mod fs;
pub mod hash;
