//! Shared domain types for the telemon metric pipeline.
//!
//! The [`metric`] module holds the metric value model used by both the agent
//! and the server; [`model`] holds the JSON wire documents exchanged over
//! HTTP; [`proto`] holds the generated gRPC types.

pub mod metric;
pub mod model;

pub mod proto {
    #![allow(clippy::pedantic)]
    #![allow(clippy::missing_errors_doc)]
    #![allow(clippy::doc_markdown)]
    #![allow(clippy::default_trait_access)]
    tonic::include_proto!("telemon");
}
