//! Integration tests for gowalla-client
//!
//! Uses wiremock to simulate the Gowalla API and verifies request
//! composition, OAuth exchanges, error classification and background
//! dispatch end to end through the reqwest transport.

mod common;

mod test_background;
mod test_errors;
mod test_oauth;
mod test_requests;
