//! # mini_http
//! src/lib.rs
//!
//! Servidor HTTP embebible: acepta conexiones TCP (opcionalmente TLS), lee
//! un único request por conexión, lo despacha al primer handler cuyo patrón
//! coincide con el path y deja que el handler escriba la respuesta. Los
//! headers se emiten recién con el primer byte del body.
//!
//! ## Arquitectura
//!
//! - `http`: Request, Response, codec de query/headers, códigos de estado
//! - `router`: Lista ordenada de (handler, patrón)
//! - `server`: Accept loop, manejo de conexiones, transporte, despacho
//! - `config`: Configuración CLI/env del binario
//! - `error`: Tipos de error
//!
//! ## Ejemplo de uso
//!
//! ```no_run
//! use mini_http::error::HandlerResult;
//! use mini_http::http::{Request, Response};
//! use mini_http::server::Server;
//!
//! fn hello(req: &mut Request, res: &mut Response) -> HandlerResult {
//!     let name = req.parameter("name").unwrap_or("World").to_string();
//!     res.set_content_type("text/plain");
//!     res.send(format!("Hello {}", name))?;
//!     Ok(())
//! }
//!
//! let mut server = Server::new(8080);
//! server.add_handler(hello);
//! server.start();
//! server.wait();
//! ```

pub mod config;
pub mod error;
pub mod http;
pub mod router;
pub mod server;
