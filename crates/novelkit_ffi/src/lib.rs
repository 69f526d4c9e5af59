//! Flutter-facing bindings for NovelKit core.

pub mod api;
