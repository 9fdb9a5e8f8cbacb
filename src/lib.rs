pub mod auth;
pub mod backend;
pub mod banner;
pub mod capabilities;
pub mod config;
pub mod consts;
pub mod crew;
pub mod crews;
pub mod engine;
pub mod events;
pub mod memory;
pub mod progress;
pub mod prompts;
pub mod relay;
pub mod spinner;
pub mod telemetry;
pub mod template;
