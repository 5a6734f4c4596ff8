//! Loading, summarising and differencing of network-analyzer measurement
//! files (single-port Touchstone `.s1p` and frequency-domain `.dat`).

pub mod config;
pub mod data;
