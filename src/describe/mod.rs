//! Description generation for document pictures.
//!
//! Provides the vision-model abstraction, the AWS Bedrock backend, and a
//! concurrent batch engine that dispatches bounded fan-out requests and
//! returns outcomes aligned with the input batch.

pub(crate) mod bedrock;
pub(crate) mod describer;
pub(crate) mod model;
pub(crate) mod retry;

pub use bedrock::BedrockVision;
pub use describer::{BatchOptions, DescribeOutcome, Describer};
pub use model::{DescribeRequest, Description, ImagePayload, VisionModel};
