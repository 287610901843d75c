//! Wire format of a queued email request.

use thiserror::Error;

/// One email to send, as published by producers.
///
/// Encoded as the protobuf message `EmailMsg`.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct EmailRequest {
    #[prost(string, tag = "1")]
    pub from: String,

    #[prost(string, tag = "2")]
    pub to: String,

    #[prost(string, tag = "3")]
    pub subject: String,

    #[prost(string, tag = "4")]
    pub text: String,
}

/// A delivery body that is not a valid `EmailMsg`.
#[derive(Debug, Error)]
#[error("Unable to decode email request: {0}")]
pub struct DecodeError(#[from] prost::DecodeError);

/// Decode a delivery body.
///
/// # Errors
///
/// Truncated buffers, unexpected wire types and non UTF-8 strings are all
/// rejected.
pub fn decode(body: &[u8]) -> Result<EmailRequest, DecodeError> {
    Ok(<EmailRequest as prost::Message>::decode(body)?)
}
