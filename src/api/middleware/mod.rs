//! Middleware stack (outermost → innermost):
//! 1. Staff authentication
//! 2. Access logging

pub mod audit;
pub mod auth;
