//! Motor de dispatch de turnos para flotas de reparto
//!
//! Cubre la generación del schedule semanal, el ciclo de confirmación
//! con auto-drop, el mercado de bidding (competitive/instant/emergency),
//! la detección de no-shows con reasignación de emergencia y el score de
//! salud/reputación por conductor que realimenta al bidding.

pub mod config;
pub mod controllers;
pub mod database;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;
