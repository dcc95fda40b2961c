//! End-to-end tests driving the engine through its public API.

mod mocks;
mod lifecycle;
mod persistence;
