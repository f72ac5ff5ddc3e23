//! # Test Suite for the Prayer Companion
//!
//! Cross-module tests that exercise the library the way the binary does: full app
//! scenarios against real storage, command line parsing, and property checks over the
//! calculators. Per-module unit tests live next to their code.
