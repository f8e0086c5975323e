#![forbid(unsafe_code)]

pub mod app_services;
pub mod catalog_service;
pub mod credentials;
pub mod error;
pub mod generate;
pub mod identity_service;
pub mod progress_service;

pub use portal_core::Clock;

pub use app_services::AppServices;
pub use catalog_service::CatalogService;
pub use error::{
    AppServicesError, CatalogServiceError, IdentityServiceError, ProgressServiceError,
};
pub use identity_service::{IdentityService, Session};
pub use progress_service::ProgressService;
