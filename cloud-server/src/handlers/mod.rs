//! HTTP handlers

pub mod alert;
pub mod health;
pub mod home;
