//! Model providers for the TARS round driver.

pub mod config;
pub mod openai_compatible;

pub use config::ProviderConfig;
pub use openai_compatible::{
    build_request_body, classify_http_error, encode_transcript, parse_completion,
    OpenAiCompatibleClient,
};
