//! # Configuración del Servidor
//! src/config.rs
//!
//! Configuración del binario con soporte para argumentos CLI y variables
//! de entorno. La librería no la necesita: `Server::new` funciona sin
//! ella, y `Server::from_config` la traduce a builders.
//!
//! ## Ejemplos de uso
//!
//! ### CLI
//! ```bash
//! ./mini_http --port 8080 --workers 8 --queue 512 --accept-timeout 1000
//! ```
//!
//! ### Variables de entorno
//! ```bash
//! HTTP_PORT=8443 HTTP_SECURE=true HTTP_TLS_IDENTITY=./identity.p12 ./mini_http
//! ```

use clap::Parser;
use std::path::PathBuf;

/// Configuración del servidor
#[derive(Debug, Clone, Parser)]
#[command(name = "mini_http")]
#[command(about = "Servidor HTTP/1.0 embebible, un request por conexión")]
#[command(version = "0.1.0")]
pub struct Config {
    /// Puerto en el que escucha el servidor (0 = efímero)
    #[arg(short, long, default_value = "8080", env = "HTTP_PORT")]
    pub port: u16,

    /// Host/IP en el que escucha
    #[arg(long, default_value = "0.0.0.0", env = "HTTP_HOST")]
    pub host: String,

    // === TLS ===

    /// Acepta conexiones TLS en lugar de TCP plano
    #[arg(long, default_value_t = false, env = "HTTP_SECURE")]
    pub secure: bool,

    /// Archivo PKCS#12 con certificado y clave privada
    #[arg(long = "tls-identity", env = "HTTP_TLS_IDENTITY")]
    pub tls_identity: Option<PathBuf>,

    /// Password del archivo PKCS#12
    #[arg(long = "tls-password", default_value = "", env = "HTTP_TLS_PASSWORD")]
    pub tls_password: String,

    // === Despacho ===

    /// Threads del pool de workers (0 = atender en el accept loop)
    #[arg(long, default_value = "4", env = "HTTP_WORKERS")]
    pub workers: usize,

    /// Conexiones que pueden esperar en la cola del pool
    #[arg(long = "queue", default_value = "256", env = "HTTP_QUEUE")]
    pub queue_capacity: usize,

    /// Timeout de accept en milisegundos (latencia máxima de stop)
    #[arg(long = "accept-timeout", default_value = "1000", env = "HTTP_ACCEPT_TIMEOUT")]
    pub accept_timeout_ms: u64,

    // === Logging ===

    /// Nivel máximo de log (trace, debug, info, warn, error)
    #[arg(long = "log-level", default_value = "info", env = "HTTP_LOG_LEVEL")]
    pub log_level: tracing::Level,
}

impl Config {
    /// Crea una nueva configuración parseando argumentos CLI
    pub fn new() -> Self {
        Config::parse()
    }

    /// Obtiene la dirección completa para bind (host:port)
    ///
    /// # Ejemplo
    /// ```rust
    /// use mini_http::config::Config;
    ///
    /// let config = Config::default();
    /// assert_eq!(config.address(), "0.0.0.0:8080");
    /// ```
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Valida la configuración
    ///
    /// Retorna errores si hay valores inválidos
    pub fn validate(&self) -> Result<(), String> {
        if self.secure && self.tls_identity.is_none() {
            return Err("Secure mode requires a TLS identity".to_string());
        }

        if self.workers > 0 && self.queue_capacity == 0 {
            return Err("Queue capacity must be >= 1 when workers are enabled".to_string());
        }

        if self.accept_timeout_ms == 0 {
            return Err("Accept timeout must be > 0".to_string());
        }

        Ok(())
    }

    /// Imprime un resumen de la configuración
    pub fn print_summary(&self) {
        println!("=================================");
        println!("  mini_http HTTP/1.0 Server");
        println!("=================================");
        println!("   Address:        {}", self.address());
        println!("   Secure:         {}", self.secure);
        if self.workers > 0 {
            println!("   Dispatch:       pool ({} workers, queue {})", self.workers, self.queue_capacity);
        } else {
            println!("   Dispatch:       inline");
        }
        println!("   Accept timeout: {} ms", self.accept_timeout_ms);
        println!("   Log level:      {}", self.log_level);
        println!();
    }
}

impl Default for Config {
    /// Configuración por defecto
    fn default() -> Self {
        Self {
            port: 8080,
            host: "0.0.0.0".to_string(),
            secure: false,
            tls_identity: None,
            tls_password: String::new(),
            workers: 4,
            queue_capacity: 256,
            accept_timeout_ms: 1000,
            log_level: tracing::Level::INFO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.host, "0.0.0.0");
        assert!(!config.secure);
        assert_eq!(config.workers, 4);
        assert_eq!(config.accept_timeout_ms, 1000);
    }

    #[test]
    fn test_address_custom() {
        let mut config = Config::default();
        config.host = "127.0.0.1".to_string();
        config.port = 3000;
        assert_eq!(config.address(), "127.0.0.1:3000");
    }

    #[test]
    fn test_validate_success() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_secure_without_identity() {
        let mut config = Config::default();
        config.secure = true;
        let result = config.validate();
        assert!(result.unwrap_err().contains("TLS identity"));

        config.tls_identity = Some(PathBuf::from("identity.p12"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_queue_only_matters_with_workers() {
        let mut config = Config::default();
        config.queue_capacity = 0;
        assert!(config.validate().unwrap_err().contains("Queue capacity"));

        config.workers = 0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_accept_timeout() {
        let mut config = Config::default();
        config.accept_timeout_ms = 0;
        assert!(config.validate().unwrap_err().contains("Accept timeout"));
    }

    #[test]
    fn test_parse_cli_args() {
        let config = Config::try_parse_from([
            "mini_http",
            "--port",
            "9000",
            "--workers",
            "0",
            "--accept-timeout",
            "250",
            "--log-level",
            "debug",
        ])
        .unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.workers, 0);
        assert_eq!(config.accept_timeout_ms, 250);
        assert_eq!(config.log_level, tracing::Level::DEBUG);
    }

    #[test]
    fn test_parse_rejects_bad_port() {
        assert!(Config::try_parse_from(["mini_http", "--port", "99999"]).is_err());
    }
}
