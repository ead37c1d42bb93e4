//! Client library for the UniStay student-housing marketplace.
//!
//! Students browse and book properties, landlords list them and answer booking
//! requests, administrators moderate. All state lives in a remote table
//! backend reached through [`backend::DataService`]; the repositories map rows
//! to domain types and the view models hold one state snapshot per screen.

pub mod availability;
pub mod backend;
pub mod config;
pub mod domain;
pub mod error;
pub mod geo;
pub mod ratings;
pub mod repository;
pub mod search;
pub mod session;
pub mod telemetry;
pub mod viewmodel;
