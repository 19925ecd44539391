//! Content-based movie recommendations with poster art.
//!
//! The movie table and similarity matrix are loaded once from snapshot files
//! and ranked in memory; posters come from TMDB through [`services::PosterFetcher`].

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
