//! # Transporte de Conexiones
//! src/server/transport.rs
//!
//! El socket que escucha siempre es TCP. El transporte decide qué stream
//! de bytes se construye sobre cada conexión aceptada: el propio
//! `TcpStream` o una sesión TLS encima de él.
//!
//! El handshake TLS corre en la línea de ejecución que atiende la
//! conexión, nunca en el accept loop.

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};

/// Stream bidireccional de una conexión aceptada
pub trait Connection: Read + Write + Send {
    /// Cierra la conexión en ambos sentidos
    fn close(&mut self) -> io::Result<()>;

    /// Dirección del cliente, si se conoce
    fn peer_addr(&self) -> Option<SocketAddr> {
        None
    }
}

impl Connection for TcpStream {
    fn close(&mut self) -> io::Result<()> {
        self.shutdown(Shutdown::Both)
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        TcpStream::peer_addr(self).ok()
    }
}

/// Fábrica de conexiones sobre sockets TCP aceptados
pub trait Transport: Send + Sync {
    /// Convierte el socket aceptado en el stream que verá el servidor
    fn establish(&self, stream: TcpStream) -> io::Result<Box<dyn Connection>>;

    /// `true` si las conexiones van cifradas
    fn is_secure(&self) -> bool {
        false
    }
}

/// Transporte sin cifrado: el `TcpStream` tal cual
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTransport;

impl Transport for PlainTransport {
    fn establish(&self, stream: TcpStream) -> io::Result<Box<dyn Connection>> {
        Ok(Box::new(stream))
    }
}

#[cfg(feature = "tls")]
pub use tls::TlsTransport;

#[cfg(feature = "tls")]
mod tls {
    use super::{Connection, Transport};
    use crate::error::ServerError;
    use native_tls::{Identity, TlsAcceptor, TlsStream};
    use std::io;
    use std::net::{SocketAddr, TcpStream};
    use std::path::Path;

    impl Connection for TlsStream<TcpStream> {
        fn close(&mut self) -> io::Result<()> {
            self.shutdown()
        }

        fn peer_addr(&self) -> Option<SocketAddr> {
            self.get_ref().peer_addr().ok()
        }
    }

    /// Transporte TLS con una identidad PKCS#12 fija
    #[derive(Clone)]
    pub struct TlsTransport {
        acceptor: TlsAcceptor,
    }

    impl TlsTransport {
        pub fn new(acceptor: TlsAcceptor) -> Self {
            Self { acceptor }
        }

        /// Carga la identidad (certificado + clave) desde un archivo PKCS#12
        pub fn from_pkcs12(path: &Path, password: &str) -> Result<Self, ServerError> {
            let der = std::fs::read(path)?;
            let identity = Identity::from_pkcs12(&der, password)
                .map_err(|e| ServerError::tls(format!("failed to load identity {}: {}", path.display(), e)))?;
            let acceptor = TlsAcceptor::new(identity)
                .map_err(|e| ServerError::tls(format!("failed to create acceptor: {}", e)))?;
            Ok(Self::new(acceptor))
        }
    }

    impl Transport for TlsTransport {
        fn establish(&self, stream: TcpStream) -> io::Result<Box<dyn Connection>> {
            let session = self
                .acceptor
                .accept(stream)
                .map_err(|e| io::Error::new(io::ErrorKind::ConnectionAborted, format!("tls handshake failed: {}", e)))?;
            Ok(Box::new(session))
        }

        fn is_secure(&self) -> bool {
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    #[test]
    fn test_plain_transport_passes_stream_through() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let mut client = TcpStream::connect(addr).unwrap();
        let (accepted, _) = listener.accept().unwrap();

        let transport = PlainTransport;
        assert!(!transport.is_secure());

        let mut conn = transport.establish(accepted).unwrap();
        assert!(conn.peer_addr().is_some());

        conn.write_all(b"ping").unwrap();
        conn.close().unwrap();

        let mut received = String::new();
        client.read_to_string(&mut received).unwrap();
        assert_eq!(received, "ping");
    }

    #[cfg(feature = "tls")]
    #[test]
    fn test_tls_identity_missing_file() {
        let path = std::env::temp_dir().join(format!("mini_http-{}-absent.p12", std::process::id()));

        let result = TlsTransport::from_pkcs12(&path, "");
        assert!(matches!(result, Err(crate::error::ServerError::Transport { .. })));
    }

    #[cfg(feature = "tls")]
    #[test]
    fn test_tls_identity_garbage_file() {
        let path = std::env::temp_dir().join(format!("mini_http-{}-garbage.p12", std::process::id()));
        std::fs::write(&path, b"definitely not pkcs12").unwrap();

        let result = TlsTransport::from_pkcs12(&path, "secret");
        std::fs::remove_file(&path).unwrap();

        assert!(matches!(result, Err(crate::error::ServerError::Tls { .. })));
    }
}
