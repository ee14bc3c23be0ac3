pub mod license_service;
pub mod webhook_service;
