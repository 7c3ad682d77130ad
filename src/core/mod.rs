//! Shared types used across the tool and protocol layers.

pub mod tool;
