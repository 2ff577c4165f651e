//! Campus shuttle arrival board server.
//!
//! Polls the live ETA, schedule and service-status feeds, decides whether
//! live data is fresh enough to show, and falls back to the printed
//! timetable when it is not.

pub mod cache;
pub mod config;
pub mod domain;
pub mod feeds;
pub mod timetable;
pub mod tracker;
pub mod web;
