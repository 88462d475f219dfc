//! Delivery-method distribution by gestational week, computed from
//! fixed-width natality microdata.

pub mod analysis;
pub mod color;
pub mod config;
pub mod data;
pub mod error;
pub mod report;
