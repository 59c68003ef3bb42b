//! Exposition formats.

pub mod text;
