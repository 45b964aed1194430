use crate::error::ErrorKind;

/// Transport-level rendering of an error kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorStatus {
    pub http_status: u16,
    /// Numeric code carried in error envelopes.
    pub code: u16,
}

pub const fn status_for(kind: ErrorKind) -> ErrorStatus {
    let (http_status, code) = match kind {
        ErrorKind::UnknownOperationKind => (500, 1),
        ErrorKind::Store => (500, 2),
        ErrorKind::UnresolvedResource => (404, 3),
        ErrorKind::PermissionDenied => (401, 4),
        ErrorKind::UpstreamFailure => (502, 5),
        ErrorKind::UnsupportedConversion | ErrorKind::UnrenderableFormat => (400, 6),
        ErrorKind::InvalidInput => (417, 6),
        ErrorKind::Canceled => (499, 7),
    };
    ErrorStatus { http_status, code }
}
