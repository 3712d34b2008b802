// Library exports for testing
pub mod accumulator;
pub mod capture;
pub mod chunk;
pub mod config;
pub mod constants;
pub mod dispatch;
pub mod engine;
pub mod model_download;
pub mod pipeline;
pub mod scheduler;
pub mod transcript;
pub mod worker;
