mod client;
mod network;

pub use client::{
    send_with_retry, HttpClient, HttpError, HttpRequestParts, HttpResponseParts, ReqwestHttpClient, SendOptions,
};
pub use network::{NetworkDenied, NetworkPolicy};
