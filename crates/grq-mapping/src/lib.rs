//! GRQ Mapping: entities onto the selected model's fields.
//!
//! Every mapping carries an explicit role — filter value or generic
//! identifier — so downstream query construction never confuses a
//! category word with a literal to filter on.

pub mod mapper;

pub use mapper::FieldMapper;
