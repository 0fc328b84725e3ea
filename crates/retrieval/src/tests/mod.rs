//! End-to-end scenario tests for the retrieval pipeline.

mod scenarios;
