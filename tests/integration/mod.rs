//! Integration tests for layered scene composition

mod child_names;
mod config;
mod layer_stack;
mod payloads;
mod targets;
mod test_utils;
mod variants;
