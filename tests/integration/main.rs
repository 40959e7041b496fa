//! Integration tests for the harvest pipeline
//!
//! `pipeline_tests` drive the scraper through in-memory doubles;
//! `http_tests` run it against wiremock servers with the real fetcher and
//! filesystem sink.

mod pipeline_tests;
