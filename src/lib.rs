//! Client for running C/C++ programs on the Signaloid analysis service and
//! turning the final distribution they print into a plot.

pub mod api;
pub mod banner;
pub mod config;
pub mod consts;
pub mod error;
pub mod events;
pub mod extract;
pub mod orchestrator;
pub mod spinner;
pub mod task;
