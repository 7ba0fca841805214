//! Data population and output
//!
//! A [`Melter`] walks documents against a closed schema and collects rows
//! with surrogate ids and foreign keys into a [`Dataset`]. The writers
//! render a dataset as CSV files or as an SQL script.

pub mod data;
pub mod melter;
pub mod sql;
pub mod writer;

pub use data::{Dataset, MeltStats, Row, TableData};
pub use melter::Melter;
pub use sql::{SqlOptions, SqlWriter};
pub use writer::CsvWriter;
