pub mod auth_service;
pub mod credit_service;
pub mod generation_service;
pub mod stripe_service;
pub mod webhook_service;

