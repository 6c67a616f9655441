//! Adversarial and property-based test suite for `braid-core`.
//!
//! This crate contains only fixture helpers; the tests themselves live
//! under `tests/` as black-box integration tests against `braid-core`'s
//! public API (the same surface a downstream consumer would use — no
//! crate-internal shortcuts).

pub mod helpers;
