//! Integration tests, benchmarks and demos for the session-lock workspace.
