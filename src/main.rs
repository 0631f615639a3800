//! # mini_http - Entry Point
//! src/main.rs
//!
//! Servidor de demostración: saluda en cualquier path y devuelve los
//! headers recibidos en `/headers`.

use mini_http::config::Config;
use mini_http::error::HandlerResult;
use mini_http::http::{Request, Response};
use mini_http::server::Server;
use tracing::error;
use tracing_subscriber::FmtSubscriber;

/// `Hello <name>` en HTML, `World` si no hay parámetro
fn hello_handler(req: &mut Request, res: &mut Response) -> HandlerResult {
    let name = req.parameter("name").unwrap_or("World");
    let html = format!("<html><body><p>Hello {}</p></body></html>", name);

    res.set_content_type("text/html; charset=UTF-8");
    res.send(html)?;
    Ok(())
}

/// Un header recibido por línea, `Nombre: valor`
fn headers_handler(req: &mut Request, res: &mut Response) -> HandlerResult {
    let mut names: Vec<&String> = req.headers().iter().map(|(name, _)| name).collect();
    names.sort();

    let mut body = String::new();
    for name in names {
        for value in req.header_values(name).unwrap_or_default() {
            body.push_str(&format!("{}: {}\n", name, value));
        }
    }

    res.set_content_type("text/plain; charset=UTF-8");
    res.send(body)?;
    Ok(())
}

fn main() {
    let config = Config::new();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("failed to install log subscriber: {}", e);
    }

    config.print_summary();

    let mut server = match Server::from_config(&config) {
        Ok(server) => server,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.add_handler_matching(headers_handler, "/headers") {
        error!("{}", e);
        std::process::exit(1);
    }
    server.add_handler(hello_handler);

    server.start();
    if server.local_addr().is_none() {
        // El bind falló y ya quedó reportado
        std::process::exit(1);
    }

    // Bloquea hasta que el accept loop termine
    server.wait();
}
