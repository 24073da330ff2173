pub mod chart;
pub mod cleaner;
pub mod config;
pub mod dashboard;
pub mod domains;
pub mod error;
pub mod export;
pub mod fake_season;
pub mod http_cache;
pub mod http_client;
pub mod loader;
pub mod panels;
pub mod pbp_parquet;
pub mod play;
pub mod projector;
