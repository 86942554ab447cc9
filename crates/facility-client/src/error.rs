//! Client error types.

use std::fmt;

use facility_protocol::ProtocolError;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the client.
#[derive(Debug)]
pub enum ClientError {
    /// Configuration error.
    Config(String),
    /// IO error.
    Io(std::io::Error),
    /// Request could not be encoded.
    Protocol(ProtocolError),
    /// No reply after every attempt.
    RequestFailed { attempts: u32 },
    /// The server answered with a non-success status.
    Server { status: i16, message: String },
    /// Server failed to start or stopped with an error.
    Daemon(String),
    /// A reply or setting could not be rendered for output.
    Output(String),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {}", msg),
            Self::Io(err) => write!(f, "IO error: {}", err),
            Self::Protocol(err) => write!(f, "protocol error: {}", err),
            Self::RequestFailed { attempts } => {
                write!(f, "request failed: no reply after {} attempts", attempts)
            }
            Self::Server { status, message } => write!(f, "{}: {}", status, message),
            Self::Daemon(msg) => write!(f, "server error: {}", msg),
            Self::Output(msg) => write!(f, "output error: {}", msg),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Protocol(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<ProtocolError> for ClientError {
    fn from(err: ProtocolError) -> Self {
        Self::Protocol(err)
    }
}

impl From<facility_server::ServerError> for ClientError {
    fn from(err: facility_server::ServerError) -> Self {
        Self::Daemon(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(
            ClientError::RequestFailed { attempts: 5 }.to_string(),
            "request failed: no reply after 5 attempts"
        );
        assert_eq!(
            ClientError::Server {
                status: 409,
                message: "Booking time not available".into()
            }
            .to_string(),
            "409: Booking time not available"
        );
        assert_eq!(
            ClientError::Output("failed to serialize output: bad float".into()).to_string(),
            "output error: failed to serialize output: bad float"
        );
    }
}
