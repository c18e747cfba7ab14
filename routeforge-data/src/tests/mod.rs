//! Crate-level tests that exercise several collaborators together.
