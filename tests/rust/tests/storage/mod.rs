//! Brain persistence tests
