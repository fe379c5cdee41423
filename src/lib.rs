pub mod config;
pub mod live;
pub mod models;
pub mod report;
pub mod visits;
