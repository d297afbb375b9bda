//! Message access by offset.

pub mod reader;
