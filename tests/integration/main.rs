//! Integration tests against scripted endpoints

mod config_test;
mod monitor_test;
mod race_test;
