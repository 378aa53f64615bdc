//! Inventory admin: configuration-driven admin backend over SQLite, plus the profit report.

pub mod config;
pub mod error;
pub mod extractors;
pub mod format;
pub mod handlers;
pub mod migration;
pub mod report;
pub mod response;
pub mod routes;
pub mod service;
pub mod settings;
pub mod sql;
pub mod state;
pub mod store;

pub use config::{inventory_config, resolve, FullConfig, ResolvedEntity, ResolvedModel};
pub use error::{AppError, ConfigError};
pub use migration::apply_migrations;
pub use report::{profits_from_sales, ProfitTally, ReportError};
pub use response::{success_many, success_one};
pub use routes::app;
pub use service::CrudService;
pub use settings::Settings;
pub use state::AppState;
pub use store::connect;
