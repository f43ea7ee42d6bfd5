//! Core types and logic for the Leadform lead-qualification service.
//!
//! This crate owns the form engine (block schema, form definitions, the
//! renderer and the answer collector), the submission pipeline, notification
//! dispatch, submission triage and the missed-call responder. It is free of
//! HTTP and database dependencies; storage backends implement
//! [`store::LeadStore`] and delivery backends implement the sender traits in
//! [`notify`].

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod answer;
pub mod block;
pub mod call;
pub mod error;
pub mod form;
pub mod memory;
pub mod notify;
pub mod pipeline;
pub mod render;
pub mod store;
pub mod submission;
pub mod template;
pub mod tenant;

pub use error::{Error, Result, ValidationError, ValidationIssue};
