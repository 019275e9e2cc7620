//! Annotation catalog server library.
//!
//! Stores images with their polygon annotations in a relational database,
//! keeps uploaded image files on local disk and serves them resized on
//! request.

pub mod api;
pub mod config;
pub mod db;
pub mod entity;
pub mod error;
pub mod middleware;
pub mod migration;
pub mod models;
pub mod services;
