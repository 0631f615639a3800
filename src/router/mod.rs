//! # Sistema de Routing
//! src/router/mod.rs
//!
//! Lista ordenada de (handler, patrón opcional).
//!
//! ```text
//! path → [mapping 1] → [mapping 2] → ... → primer match
//! ```
//!
//! Un mapping sin patrón acepta cualquier path. Un patrón tiene que
//! cubrir el path completo, no basta con encontrarlo dentro. Si ningún
//! mapping coincide no hay handler: el router no inventa un 404.

use crate::error::{HandlerResult, ServerError};
use crate::http::{Request, Response};
use regex::Regex;
use std::fmt;
use std::sync::Arc;

/// Callback que produce la respuesta de un request
///
/// Las closures `Fn(&mut Request, &mut Response) -> HandlerResult`
/// implementan este trait automáticamente.
pub trait Handler: Send + Sync {
    fn handle(&self, request: &mut Request, response: &mut Response) -> HandlerResult;
}

impl<F> Handler for F
where
    F: Fn(&mut Request, &mut Response) -> HandlerResult + Send + Sync,
{
    fn handle(&self, request: &mut Request, response: &mut Response) -> HandlerResult {
        self(request, response)
    }
}

/// Patrón de URL anclado a ambos extremos del path
#[derive(Clone)]
pub struct PathPattern {
    source: String,
    regex: Regex,
}

impl PathPattern {
    /// Compila `pattern` como `^(?:pattern)$`
    ///
    /// # Ejemplo
    /// ```
    /// use mini_http::router::PathPattern;
    ///
    /// let pattern = PathPattern::new("/api/.*").unwrap();
    /// assert!(pattern.matches("/api/users"));
    /// assert!(!pattern.matches("/v1/api/users"));
    /// ```
    pub fn new(pattern: &str) -> Result<Self, ServerError> {
        let regex = Regex::new(&format!("^(?:{})$", pattern))?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }
}

impl fmt::Debug for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PathPattern").field(&self.source).finish()
    }
}

/// Un registro del router
#[derive(Clone)]
pub struct HandlerMapping {
    handler: Arc<dyn Handler>,
    pattern: Option<PathPattern>,
}

impl HandlerMapping {
    pub fn handler(&self) -> &Arc<dyn Handler> {
        &self.handler
    }

    pub fn pattern(&self) -> Option<&PathPattern> {
        self.pattern.as_ref()
    }

    fn matches(&self, path: &str) -> bool {
        self.pattern.as_ref().map_or(true, |pattern| pattern.matches(path))
    }
}

impl fmt::Debug for HandlerMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerMapping")
            .field("pattern", &self.pattern)
            .finish_non_exhaustive()
    }
}

/// Router que mapea paths a handlers
#[derive(Default, Clone)]
pub struct Router {
    mappings: Vec<HandlerMapping>,
}

impl Router {
    /// Crea un nuevo router vacío
    pub fn new() -> Self {
        Self::default()
    }

    /// Registra un handler al final de la lista
    ///
    /// Sin patrón, el handler acepta cualquier path. No hay deduplicación.
    ///
    /// # Ejemplo
    /// ```
    /// use mini_http::router::{PathPattern, Router};
    /// use mini_http::error::HandlerResult;
    /// use mini_http::http::{Request, Response};
    ///
    /// let mut router = Router::new();
    /// router.register(
    ///     |_req: &mut Request, res: &mut Response| -> HandlerResult { Ok(res.send("api")?) },
    ///     Some(PathPattern::new("/api/.*").unwrap()),
    /// );
    /// router.register(|_req: &mut Request, _res: &mut Response| -> HandlerResult { Ok(()) }, None);
    /// assert_eq!(router.len(), 2);
    /// ```
    pub fn register<H>(&mut self, handler: H, pattern: Option<PathPattern>)
    where
        H: Handler + 'static,
    {
        self.register_arc(Arc::new(handler), pattern);
    }

    pub fn register_arc(&mut self, handler: Arc<dyn Handler>, pattern: Option<PathPattern>) {
        self.mappings.push(HandlerMapping { handler, pattern });
    }

    /// Primer mapping, en orden de registro, que acepta `path`
    pub fn resolve(&self, path: &str) -> Option<&HandlerMapping> {
        self.mappings.iter().find(|mapping| mapping.matches(path))
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("mappings", &self.mappings)
            .finish()
    }
}
