//! Integration tests for the marble race engine.

mod recording_presenter;
mod cycle;
mod scheduler;
