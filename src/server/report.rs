//! # Reporte de Errores
//! src/server/report.rs
//!
//! Sumidero de mensajes de error de una línea. El accept loop y las
//! conexiones no tienen a quién devolver sus errores, así que los
//! entregan aquí.

/// Recibe un mensaje de error legible
pub trait ErrorReporter: Send + Sync {
    fn report(&self, message: &str);
}

/// Reporter por defecto: cada mensaje va a `tracing::error!`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, message: &str) {
        tracing::error!("{}", message);
    }
}
