//! HTTP request handlers.
//!
//! This module contains all the endpoint handlers for the gateway.

pub mod assets;
pub mod bus;
pub mod health;
