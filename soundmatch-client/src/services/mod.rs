//! External service clients

pub mod similarity_client;

pub use similarity_client::{HttpSimilarityClient, ServiceError, SimilarityService};
