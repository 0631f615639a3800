//! # Módulo del Servidor HTTP
//! src/server/mod.rs
//!
//! Este módulo implementa el servidor TCP que:
//! 1. Escucha en un puerto (TCP plano o TLS)
//! 2. Acepta conexiones con timeout para poder detenerse
//! 3. Despacha cada conexión inline o a un executor
//! 4. Lee el request, invoca el handler y cierra

pub mod connection;
pub mod dispatch;
pub mod pool;
pub mod report;
pub mod tcp;
pub mod transport;

// Re-exportar para facilitar el uso
pub use dispatch::{Dispatch, Executor, Task};
pub use pool::WorkerPool;
pub use report::{ErrorReporter, TracingReporter};
pub use tcp::{Server, DEFAULT_ACCEPT_TIMEOUT};
pub use transport::{Connection, PlainTransport, Transport};

#[cfg(feature = "tls")]
pub use transport::TlsTransport;
