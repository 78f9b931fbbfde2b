//! Tests for the catalogue service
