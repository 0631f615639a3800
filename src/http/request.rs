//! # Parsing de Requests
//! src/http/request.rs
//!
//! Lee un único request desde el stream de la conexión.
//!
//! ## Formato aceptado
//!
//! ```text
//! GET /path?param1=value1&param2=value2\r\n
//! Host: localhost:8080\r\n
//! \r\n
//! <body sin consumir>
//! ```
//!
//! El token de versión (`HTTP/1.0`) es opcional y se ignora. Todo lo que
//! venga después de la línea vacía queda en el stream para el handler.

use super::params::{self, MultiMap};
use crate::error::ServerError;
use std::fmt;
use std::io::{self, BufRead};

/// Stream de entrada de la conexión, posicionado tras los headers
pub type BodyReader = Box<dyn BufRead + Send>;

/// Request HTTP parseado
///
/// Solo lectura para el handler, salvo el body, que se consume leyendo.
pub struct Request {
    /// Método tal como llegó (ej: "GET")
    method: String,

    /// Path sin la query (ej: "/api/users")
    path: String,

    /// Parámetros de la query, decodificados
    parameters: MultiMap,

    /// Headers tal como llegaron (claves sensibles a mayúsculas)
    headers: MultiMap,

    body: BodyReader,
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("parameters", &self.parameters)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

impl Request {
    /// Lee request line y headers desde `reader`
    ///
    /// El reader queda como body del request.
    ///
    /// # Errores
    ///
    /// * `MalformedRequest` - la conexión no trae ninguna línea, o la
    ///   request line no tiene target
    /// * `Transport` - fallo de lectura del socket
    ///
    /// # Ejemplo
    ///
    /// ```
    /// use mini_http::http::Request;
    /// use std::io::Cursor;
    ///
    /// let raw = Cursor::new(b"GET /hello?name=Joe HTTP/1.0\r\n\r\n".to_vec());
    /// let request = Request::parse(Box::new(raw)).unwrap();
    ///
    /// assert_eq!(request.path(), "/hello");
    /// assert_eq!(request.parameter("name"), Some("Joe"));
    /// ```
    pub fn parse(mut reader: BodyReader) -> Result<Self, ServerError> {
        let line = read_line(&mut reader)?
            .ok_or_else(|| ServerError::malformed("no request line"))?;

        let mut parts = line.split_whitespace();
        let method = parts
            .next()
            .ok_or_else(|| ServerError::malformed("empty request line"))?
            .to_string();
        let target = parts
            .next()
            .ok_or_else(|| ServerError::malformed(format!("missing target in '{}'", line)))?;

        let (path, parameters) = match target.find('?') {
            Some(pos) => (target[..pos].to_string(), params::parse_query(&target[pos + 1..])),
            None => (target.to_string(), MultiMap::new()),
        };

        // Headers hasta la línea vacía o fin del stream
        let mut headers = MultiMap::new();
        while let Some(line) = read_line(&mut reader)? {
            if line.is_empty() {
                break;
            }
            params::append_header_line(&mut headers, &line);
        }

        Ok(Request {
            method,
            path,
            parameters,
            headers,
            body: reader,
        })
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn parameters(&self) -> &MultiMap {
        &self.parameters
    }

    /// Primer valor del parámetro `name`
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters.get(name)
    }

    /// Todos los valores del parámetro `name`
    pub fn parameter_values(&self, name: &str) -> Option<&[String]> {
        self.parameters.get_all(name)
    }

    pub fn headers(&self) -> &MultiMap {
        &self.headers
    }

    /// Primer valor del header `name` (comparación exacta)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    pub fn header_values(&self, name: &str) -> Option<&[String]> {
        self.headers.get_all(name)
    }

    /// Bytes restantes de la conexión, sin consumir
    pub fn body(&mut self) -> &mut dyn BufRead {
        &mut *self.body
    }
}

/// Lee una línea terminada en `\n` o `\r\n`
///
/// Retorna `None` en fin de stream. Los bytes no UTF-8 se reemplazan.
fn read_line(reader: &mut dyn BufRead) -> io::Result<Option<String>> {
    let mut buf = Vec::new();
    if reader.read_until(b'\n', &mut buf)? == 0 {
        return Ok(None);
    }

    if buf.last() == Some(&b'\n') {
        buf.pop();
    }
    if buf.last() == Some(&b'\r') {
        buf.pop();
    }

    Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
}
