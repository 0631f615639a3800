//! # Manejo de una Conexión
//! src/server/connection.rs
//!
//! Un request por conexión, siempre en la misma línea de ejecución:
//!
//! 1. Lee request line y headers
//! 2. Construye Request (lectura) y Response (escritura) sobre el mismo stream
//! 3. Resuelve el handler y lo invoca
//! 4. Flush y cierre, pase lo que pase en el handler

use super::report::ErrorReporter;
use super::transport::Connection;
use crate::error::ServerError;
use crate::http::{Request, Response};
use crate::router::Router;
use std::any::Any;
use std::io::{self, BufReader, Read, Write};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, trace};

/// Conexión compartida entre el lado de lectura (Request) y el de
/// escritura (Response)
#[derive(Clone)]
struct SharedConnection(Arc<Mutex<Box<dyn Connection>>>);

impl SharedConnection {
    fn new(conn: Box<dyn Connection>) -> Self {
        Self(Arc::new(Mutex::new(conn)))
    }

    fn lock(&self) -> MutexGuard<'_, Box<dyn Connection>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Read for SharedConnection {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.lock().read(buf)
    }
}

impl Write for SharedConnection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.lock().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.lock().flush()
    }
}

/// Atiende una conexión completa
///
/// Nunca retorna error: todo fallo se entrega a `reporter` y la conexión
/// se cierra igual.
pub fn handle_connection(conn: Box<dyn Connection>, router: &Router, reporter: &dyn ErrorReporter) {
    let peer = conn
        .peer_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let shared = SharedConnection::new(conn);

    if let Err(e) = serve(&shared, router, reporter) {
        reporter.report(&format!("connection from {}: {}", peer, e));
    }

    let closed = shared.lock().close();
    if let Err(e) = closed {
        // El cliente pudo haber cerrado primero
        trace!(peer = %peer, "close failed: {}", e);
    }
}

fn serve(shared: &SharedConnection, router: &Router, reporter: &dyn ErrorReporter) -> Result<(), ServerError> {
    let mut request = Request::parse(Box::new(BufReader::new(shared.clone())))?;
    debug!(method = request.method(), path = request.path(), "request received");

    let mapping = match router.resolve(request.path()) {
        Some(mapping) => mapping,
        None => {
            // Sin handler no se genera respuesta: solo flush del socket
            debug!(path = request.path(), "no handler matched");
            shared.clone().flush()?;
            return Ok(());
        }
    };

    let mut response = Response::new(Box::new(shared.clone()));
    let handler = mapping.handler();

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler.handle(&mut request, &mut response)));
    let failure = match outcome {
        Ok(Ok(())) => None,
        Ok(Err(e)) => Some(e.to_string()),
        Err(payload) => Some(format!("panic: {}", panic_message(payload.as_ref()))),
    };
    if let Some(reason) = failure {
        let err = ServerError::handler(reason);
        reporter.report(&format!("{} {}: {}", request.method(), request.path(), err));
    }

    // Fuerza la emisión de headers si el handler no escribió nada
    response.flush()?;
    Ok(())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
