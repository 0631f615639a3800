//! # Errores del Servidor
//! src/error.rs
//!
//! Taxonomía de fallos del servidor. Ninguno se reintenta: un error de
//! transporte termina el accept loop, cualquier otro termina solo la
//! conexión afectada.

use std::io;
use thiserror::Error;

/// Error devuelto por un handler. Cualquier tipo de error sirve.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Resultado de invocar un handler
pub type HandlerResult = Result<(), HandlerError>;

#[derive(Debug, Error)]
pub enum ServerError {
    /// Fallo del socket: bind, accept, lectura o escritura
    #[error("transport error: {source}")]
    Transport {
        #[from]
        source: io::Error,
    },

    /// Fallo al preparar el transporte seguro o en el handshake
    #[error("tls error: {reason}")]
    Tls { reason: String },

    /// No hay request line, o le falta el target
    #[error("malformed request: {reason}")]
    MalformedRequest { reason: String },

    /// El handler devolvió un error o hizo panic
    #[error("handler failed: {reason}")]
    Handler { reason: String },

    /// El executor no aceptó la tarea (cola llena o pool detenido)
    #[error("task rejected: {reason}")]
    Rejected { reason: String },

    /// Valores de configuración inconsistentes
    #[error("invalid configuration: {reason}")]
    Config { reason: String },

    /// El patrón de URL no compila
    #[error("invalid url pattern: {source}")]
    InvalidPattern {
        #[from]
        source: regex::Error,
    },
}

impl ServerError {
    pub fn tls(reason: impl Into<String>) -> Self {
        Self::Tls { reason: reason.into() }
    }

    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedRequest { reason: reason.into() }
    }

    pub fn handler(reason: impl Into<String>) -> Self {
        Self::Handler { reason: reason.into() }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected { reason: reason.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(
            ServerError::malformed("no request line").to_string(),
            "malformed request: no request line"
        );
        assert_eq!(ServerError::rejected("queue full").to_string(), "task rejected: queue full");
    }

    #[test]
    fn test_from_io_error() {
        let err: ServerError = io::Error::new(io::ErrorKind::AddrInUse, "busy").into();
        assert!(matches!(err, ServerError::Transport { .. }));
        assert!(err.to_string().contains("busy"));
    }
}
