//! Outer surfaces moving orders in and out of the process.

pub mod csv;
