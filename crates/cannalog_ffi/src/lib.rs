//! Flutter-facing bindings for the CannaLog core.

pub mod api;
