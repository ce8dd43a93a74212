//! Core data types for Tarifa

pub mod catalog;
pub mod line_item;
pub mod money;
pub mod rules;
