//! # Servidor TCP
//! src/server/tcp.rs
//!
//! El accept loop vive en un thread propio durante toda la vida del
//! servidor. Acepta con timeout (1000ms por defecto) para poder observar
//! `stop()` sin esperar a una nueva conexión.
//!
//! ## Concurrencia
//!
//! El único estado mutable compartido es el flag `running` (atómico). El
//! router se congela al llamar `start()`: registrar handlers mientras el
//! accept loop está vivo es un uso incorrecto y el mapping se descarta con
//! un warning.

use super::connection::handle_connection;
use super::dispatch::Dispatch;
use super::report::{ErrorReporter, TracingReporter};
use super::transport::{PlainTransport, Transport};
use crate::config::Config;
use crate::error::ServerError;
use crate::router::{Handler, PathPattern, Router};
use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Timeout de accept por defecto
pub const DEFAULT_ACCEPT_TIMEOUT: Duration = Duration::from_millis(1000);

/// Espera entre intentos de accept no bloqueantes
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Servidor HTTP embebible
pub struct Server {
    host: String,
    port: u16,
    router: Arc<Router>,
    transport: Arc<dyn Transport>,
    dispatch: Dispatch,
    reporter: Arc<dyn ErrorReporter>,
    accept_timeout: Duration,
    running: Arc<AtomicBool>,
    local_addr: Mutex<Option<SocketAddr>>,
    accept_thread: Mutex<Option<JoinHandle<()>>>,
}

impl Server {
    /// Servidor en `port` (todas las interfaces), sin TLS, despacho inline
    ///
    /// # Ejemplo
    /// ```no_run
    /// use mini_http::error::HandlerResult;
    /// use mini_http::http::{Request, Response};
    /// use mini_http::server::Server;
    ///
    /// let mut server = Server::new(8080);
    /// server.add_handler(|_req: &mut Request, res: &mut Response| -> HandlerResult {
    ///     Ok(res.send("Hello World")?)
    /// });
    /// server.start();
    /// ```
    pub fn new(port: u16) -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port,
            router: Arc::new(Router::new()),
            transport: Arc::new(PlainTransport),
            dispatch: Dispatch::Inline,
            reporter: Arc::new(TracingReporter),
            accept_timeout: DEFAULT_ACCEPT_TIMEOUT,
            running: Arc::new(AtomicBool::new(false)),
            local_addr: Mutex::new(None),
            accept_thread: Mutex::new(None),
        }
    }

    /// Construye el servidor a partir de la configuración
    ///
    /// Con `workers > 0` crea un [`WorkerPool`](super::WorkerPool); con
    /// `secure` carga la identidad TLS (requiere la feature `tls`).
    pub fn from_config(config: &Config) -> Result<Self, ServerError> {
        config.validate().map_err(|reason| ServerError::Config { reason })?;

        let mut server = Server::new(config.port)
            .with_host(&config.host)
            .with_accept_timeout(Duration::from_millis(config.accept_timeout_ms));

        if config.workers > 0 {
            let pool = super::WorkerPool::new(config.workers, config.queue_capacity);
            server = server.with_dispatch(Dispatch::executor(pool));
        }

        if config.secure {
            server = server.with_transport(secure_transport(config)?);
        }

        Ok(server)
    }

    pub fn with_host(mut self, host: &str) -> Self {
        self.host = host.to_string();
        self
    }

    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_dispatch(mut self, dispatch: Dispatch) -> Self {
        self.dispatch = dispatch;
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_accept_timeout(mut self, timeout: Duration) -> Self {
        self.accept_timeout = timeout;
        self
    }

    /// Registra un handler para cualquier path
    pub fn add_handler<H>(&mut self, handler: H) -> &mut Self
    where
        H: Handler + 'static,
    {
        self.register(Arc::new(handler), None)
    }

    /// Registra un handler para los paths que cumplen `pattern` completo
    ///
    /// # Errores
    ///
    /// `InvalidPattern` si el patrón no es una regex válida.
    pub fn add_handler_matching<H>(&mut self, handler: H, pattern: &str) -> Result<&mut Self, ServerError>
    where
        H: Handler + 'static,
    {
        let pattern = PathPattern::new(pattern)?;
        Ok(self.register(Arc::new(handler), Some(pattern)))
    }

    fn register(&mut self, handler: Arc<dyn Handler>, pattern: Option<PathPattern>) -> &mut Self {
        match Arc::get_mut(&mut self.router) {
            Some(router) => router.register_arc(handler, pattern),
            None => warn!(
                pattern = pattern.as_ref().map(|p| p.as_str()),
                "handler registered while the accept loop is alive, ignored"
            ),
        }
        self
    }

    /// Arranca el accept loop en un thread propio
    ///
    /// Solo la primera llamada tiene efecto (compare-and-set sobre
    /// `running`). Retorna cuando el socket ya está escuchando o cuando el
    /// bind falló; en ese caso el error se reporta y `running` vuelve a
    /// `false`.
    ///
    /// Después de `stop()` espera a que el loop anterior suelte el socket
    /// antes de volver a escuchar.
    pub fn start(&self) {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("start() ignored, server already running");
            return;
        }

        let previous = self
            .accept_thread
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(previous) = previous {
            // El loop viejo solo mira `running` entre accepts: hay que
            // bajarlo de nuevo hasta que termine
            self.running.store(false, Ordering::SeqCst);
            if previous.join().is_err() {
                self.reporter.report("accept loop panicked");
            }
            self.running.store(true, Ordering::SeqCst);
        }

        let address = format!("{}:{}", self.host, self.port);
        let accept_loop = AcceptLoop {
            router: Arc::clone(&self.router),
            transport: Arc::clone(&self.transport),
            dispatch: self.dispatch.clone(),
            reporter: Arc::clone(&self.reporter),
            accept_timeout: self.accept_timeout,
            running: Arc::clone(&self.running),
        };

        let (bound_tx, bound_rx) = mpsc::sync_channel(1);
        let spawned = thread::Builder::new()
            .name("http-accept".to_string())
            .spawn(move || accept_loop.run(&address, bound_tx));

        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                self.reporter.report(&format!("failed to spawn accept loop: {}", e));
                self.running.store(false, Ordering::SeqCst);
                return;
            }
        };

        // Si el bind falla el thread ya reportó y cerró el canal
        let bound = bound_rx.recv().ok();
        *self.local_addr.lock().unwrap_or_else(PoisonError::into_inner) = bound;
        *self.accept_thread.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
    }

    /// Pide al accept loop que termine
    ///
    /// No cierra el socket ni corta conexiones en curso: el loop lo nota
    /// dentro de un intervalo de timeout.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Espera a que el accept loop termine
    pub fn wait(&self) {
        let handle = self
            .accept_thread
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                self.reporter.report("accept loop panicked");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn is_secure(&self) -> bool {
        self.transport.is_secure()
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Dirección real del socket (útil con el puerto 0)
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }
}

#[cfg(feature = "tls")]
fn secure_transport(config: &Config) -> Result<Arc<dyn Transport>, ServerError> {
    let identity = config
        .tls_identity
        .as_deref()
        .ok_or_else(|| ServerError::tls("secure mode requires --tls-identity"))?;
    let transport = super::transport::TlsTransport::from_pkcs12(identity, &config.tls_password)?;
    Ok(Arc::new(transport))
}

#[cfg(not(feature = "tls"))]
fn secure_transport(_config: &Config) -> Result<Arc<dyn Transport>, ServerError> {
    Err(ServerError::tls("built without the `tls` feature"))
}

/// Estado que se mueve al thread del accept loop
struct AcceptLoop {
    router: Arc<Router>,
    transport: Arc<dyn Transport>,
    dispatch: Dispatch,
    reporter: Arc<dyn ErrorReporter>,
    accept_timeout: Duration,
    running: Arc<AtomicBool>,
}

impl AcceptLoop {
    fn run(self, address: &str, bound: mpsc::SyncSender<SocketAddr>) {
        let listener = match Self::bind(address) {
            Ok(listener) => listener,
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                self.reporter.report(&format!("failed to listen on {}: {}", address, e));
                return;
            }
        };

        let local = match listener.local_addr() {
            Ok(local) => local,
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                self.reporter.report(&format!("failed to read local address: {}", e));
                return;
            }
        };
        info!(address = %local, secure = self.transport.is_secure(), "server listening");
        let _ = bound.send(local);

        while self.running.load(Ordering::SeqCst) {
            match self.accept(&listener) {
                Ok(Some(stream)) => self.dispatch(stream),
                Ok(None) => continue,
                Err(e) => {
                    self.reporter.report(&format!("accept failed: {}", e));
                    break;
                }
            }
        }

        self.running.store(false, Ordering::SeqCst);
        info!(address = %local, "server stopped");
    }

    fn bind(address: &str) -> io::Result<TcpListener> {
        let listener = TcpListener::bind(address)?;
        listener.set_nonblocking(true)?;
        Ok(listener)
    }

    /// Espera una conexión hasta `accept_timeout`
    ///
    /// `Ok(None)` si venció el timeout o si se pidió `stop()` mientras
    /// tanto.
    fn accept(&self, listener: &TcpListener) -> io::Result<Option<TcpStream>> {
        let deadline = Instant::now() + self.accept_timeout;

        loop {
            match listener.accept() {
                Ok((stream, peer)) => {
                    debug!(peer = %peer, "connection accepted");
                    let prepared = stream.set_nonblocking(false).map(|()| stream);
                    if let Some(stream) = self.admit(prepared, peer) {
                        return Ok(Some(stream));
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }

            if Instant::now() >= deadline || !self.running.load(Ordering::SeqCst) {
                return Ok(None);
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    /// Descarta solo la conexión cuyo socket no se pudo preparar
    fn admit(&self, prepared: io::Result<TcpStream>, peer: SocketAddr) -> Option<TcpStream> {
        match prepared {
            Ok(stream) => Some(stream),
            Err(e) => {
                self.reporter.report(&format!("connection from {} dropped: {}", peer, e));
                None
            }
        }
    }

    fn dispatch(&self, stream: TcpStream) {
        let router = Arc::clone(&self.router);
        let transport = Arc::clone(&self.transport);
        let reporter = Arc::clone(&self.reporter);

        let task = Box::new(move || match transport.establish(stream) {
            Ok(conn) => handle_connection(conn, &router, reporter.as_ref()),
            Err(e) => reporter.report(&format!("failed to establish connection: {}", e)),
        });

        // El stream viaja dentro de la tarea: si se rechaza, se cierra al soltarla
        if let Err(e) = self.dispatch.run(task) {
            self.reporter.report(&format!("connection dropped: {}", e));
        }
    }
}
