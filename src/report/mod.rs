//! Presentation of a tabulated population: console text, JSON documents,
//! and a PNG chart.

pub mod chart;
pub mod export;
pub mod summary;
