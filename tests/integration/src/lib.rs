//! End-to-end tests for authd live under `tests/`.
