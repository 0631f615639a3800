//! # Escritura de Respuestas HTTP
//! src/http/response.rs
//!
//! La respuesta acumula status y headers en memoria y no escribe nada en
//! el socket hasta el primer `write` o `flush`. En ese momento emite el
//! bloque de headers una sola vez y a partir de ahí los bytes pasan tal
//! cual.
//!
//! ## Formato emitido
//!
//! ```text
//! HTTP/1.0 200 OK\r\n
//! Content-Type: text/html\r\n
//! \r\n
//! <body>
//! ```
//!
//! Sin `Content-Length`: el fin del body es el cierre de la conexión.
//!
//! ## Ejemplo de uso
//!
//! ```
//! use mini_http::http::Response;
//! use std::io::Write;
//!
//! let mut response = Response::new(Box::new(Vec::new()));
//! response.set_content_type("text/plain");
//! response.write_all(b"Hello").unwrap();
//! assert!(response.headers_sent());
//! ```

use super::params::MultiMap;
use super::StatusCode;
use std::fmt;
use std::io::{self, Write};

/// Destino de los bytes de la respuesta
pub type BodyWriter = Box<dyn Write + Send>;

/// Intercepta la primera escritura sobre `W` para anteponer la cabecera
///
/// El latch `head_sent` se activa antes de escribir, así la cabecera nunca
/// se emite dos veces aunque la primera escritura falle a medias.
struct FirstWrite<W> {
    inner: W,
    head_sent: bool,
}

impl<W: Write> FirstWrite<W> {
    fn new(inner: W) -> Self {
        Self {
            inner,
            head_sent: false,
        }
    }

    fn ensure_head<F>(&mut self, render: F) -> io::Result<()>
    where
        F: FnOnce() -> Vec<u8>,
    {
        if self.head_sent {
            return Ok(());
        }
        self.head_sent = true;
        self.inner.write_all(&render())
    }
}

/// Respuesta HTTP en curso
pub struct Response {
    status: u16,
    status_text: String,
    headers: MultiMap,
    output: FirstWrite<BodyWriter>,
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("status_text", &self.status_text)
            .field("headers", &self.headers)
            .field("headers_sent", &self.output.head_sent)
            .finish()
    }
}

impl Response {
    /// Crea una respuesta 200 OK sin headers sobre `output`
    pub fn new(output: BodyWriter) -> Self {
        Self {
            status: StatusCode::Ok.as_u16(),
            status_text: StatusCode::Ok.reason_phrase().to_string(),
            headers: MultiMap::new(),
            output: FirstWrite::new(output),
        }
    }

    /// Cambia código y texto de estado
    pub fn set_status(&mut self, status: u16, status_text: &str) {
        self.warn_if_sent("status");
        self.status = status;
        self.status_text = status_text.to_string();
    }

    /// Cambia el estado usando la reason phrase estándar
    pub fn set_status_code(&mut self, status: StatusCode) {
        self.set_status(status.as_u16(), status.reason_phrase());
    }

    /// Reemplaza todos los valores del header por `value`
    pub fn set_header(&mut self, name: &str, value: &str) {
        self.warn_if_sent(name);
        self.headers.set(name, value);
    }

    /// Agrega un valor más al header
    pub fn add_header(&mut self, name: &str, value: &str) {
        self.warn_if_sent(name);
        self.headers.append(name, value);
    }

    pub fn set_content_type(&mut self, content_type: &str) {
        self.set_header("Content-Type", content_type);
    }

    /// Escribe `body` completo (emite los headers si hace falta)
    pub fn send(&mut self, body: impl AsRef<[u8]>) -> io::Result<()> {
        self.write_all(body.as_ref())
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    pub fn headers(&self) -> &MultiMap {
        &self.headers
    }

    /// `true` cuando status line y headers ya están en el socket
    pub fn headers_sent(&self) -> bool {
        self.output.head_sent
    }

    fn warn_if_sent(&self, what: &str) {
        if self.output.head_sent {
            tracing::warn!(header = what, "response head already sent, change will not reach the wire");
        }
    }

    fn render_head(status: u16, status_text: &str, headers: &MultiMap) -> Vec<u8> {
        let mut head = format!("HTTP/1.0 {} {}\r\n", status, status_text);
        for (name, values) in headers {
            for value in values {
                head.push_str(name);
                head.push_str(": ");
                head.push_str(value);
                head.push_str("\r\n");
            }
        }
        head.push_str("\r\n");
        head.into_bytes()
    }
}

impl Write for Response {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let (status, text, headers) = (self.status, &self.status_text, &self.headers);
        self.output
            .ensure_head(|| Self::render_head(status, text, headers))?;
        self.output.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        let (status, text, headers) = (self.status, &self.status_text, &self.headers);
        self.output
            .ensure_head(|| Self::render_head(status, text, headers))?;
        self.output.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Sink compartido para inspeccionar lo que llegó al "socket"
    #[derive(Clone, Default)]
    struct Wire(Arc<Mutex<Vec<u8>>>);

    impl Wire {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl Write for Wire {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn response() -> (Response, Wire) {
        let wire = Wire::default();
        (Response::new(Box::new(wire.clone())), wire)
    }

    #[test]
    fn test_defaults() {
        let (response, wire) = response();

        assert_eq!(response.status(), 200);
        assert_eq!(response.status_text(), "OK");
        assert!(response.headers().is_empty());
        assert!(!response.headers_sent());
        assert!(wire.text().is_empty());
    }

    #[test]
    fn test_set_header_replaces() {
        let (mut response, _) = response();
        response.set_header("X-Mode", "first");
        response.set_header("X-Mode", "second");

        assert_eq!(response.headers().get_all("X-Mode"), Some(&["second".to_string()][..]));
    }

    #[test]
    fn test_add_header_appends() {
        let (mut response, _) = response();
        response.add_header("Set-Cookie", "a=1");
        response.add_header("Set-Cookie", "b=2");

        assert_eq!(
            response.headers().get_all("Set-Cookie"),
            Some(&["a=1".to_string(), "b=2".to_string()][..])
        );
    }

    #[test]
    fn test_nothing_written_before_first_write() {
        let (mut response, wire) = response();
        response.set_status(201, "Created");
        response.set_content_type("text/plain");

        assert!(wire.text().is_empty());

        response.send("body").unwrap();
        assert_eq!(
            wire.text(),
            "HTTP/1.0 201 Created\r\nContent-Type: text/plain\r\n\r\nbody"
        );
    }

    #[test]
    fn test_multi_value_header_lines() {
        let (mut response, wire) = response();
        response.add_header("Set-Cookie", "a=1");
        response.add_header("Set-Cookie", "b=2");
        response.flush().unwrap();

        let text = wire.text();
        let first = text.find("Set-Cookie: a=1\r\n").unwrap();
        let second = text.find("Set-Cookie: b=2\r\n").unwrap();
        assert!(first < second);
        assert!(text.ends_with("\r\n\r\n"));
    }

    #[test]
    fn test_head_emitted_once_across_flushes() {
        let (mut response, wire) = response();
        response.flush().unwrap();
        response.flush().unwrap();
        response.write_all(b"abc").unwrap();
        response.flush().unwrap();

        let text = wire.text();
        assert_eq!(text.matches("HTTP/1.0 200 OK").count(), 1);
        assert_eq!(text, "HTTP/1.0 200 OK\r\n\r\nabc");
    }

    #[test]
    fn test_changes_after_head_are_not_emitted() {
        let (mut response, wire) = response();
        response.send("one").unwrap();

        response.set_status_code(StatusCode::NotFound);
        response.set_header("X-Late", "ignored");
        response.send("two").unwrap();

        let text = wire.text();
        assert_eq!(text, "HTTP/1.0 200 OK\r\n\r\nonetwo");
        assert!(!text.contains("X-Late"));
        assert_eq!(response.status(), 404);
    }

    #[test]
    fn test_empty_write_still_sends_head() {
        let (mut response, wire) = response();
        response.write(&[]).unwrap();

        assert!(response.headers_sent());
        assert_eq!(wire.text(), "HTTP/1.0 200 OK\r\n\r\n");
    }

    #[test]
    fn test_status_code_helper() {
        let (mut response, wire) = response();
        response.set_status_code(StatusCode::NoContent);
        response.flush().unwrap();

        assert!(wire.text().starts_with("HTTP/1.0 204 No Content\r\n"));
    }
}
