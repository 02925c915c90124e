//! Integration tests for context-bound models

mod alias_context;
mod concurrency;
mod config_integration;
mod eager_loading;
mod test_utils;
