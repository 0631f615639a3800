//! # Módulo HTTP
//!
//! Protocolo mínimo estilo HTTP/1.0, un intercambio por conexión:
//!
//! - Parsing de la request line y los headers
//! - Decodificación de query strings en mapas multi-valor
//! - Respuesta con emisión diferida de headers
//! - Códigos de estado estándar
//!
//! ### Formato de Request
//!
//! ```text
//! GET /path?query=value\r\n
//! Header-Name: Header-Value\r\n
//! \r\n
//! ```
//!
//! ### Formato de Response
//!
//! ```text
//! HTTP/1.0 200 OK\r\n
//! Content-Type: text/html\r\n
//! \r\n
//! <html>...</html>
//! ```
//!
//! No hay keep-alive, chunked ni `Content-Length`: la conexión se cierra
//! tras la respuesta.

pub mod params;    // Query strings y líneas de header
pub mod request;   // Parsing del request
pub mod response;  // Respuesta con headers diferidos
pub mod status;    // Códigos de estado HTTP

pub use params::MultiMap;
pub use request::Request;
pub use response::Response;
pub use status::StatusCode;
