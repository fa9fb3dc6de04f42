//! Invoicing Service - multi-tenant invoice lifecycle, pricing and client directory.

pub mod config;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod startup;
