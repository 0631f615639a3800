//! # Codec de Parámetros y Headers
//! src/http/params.rs
//!
//! Decodifica query strings y líneas de header en mapas multi-valor.
//!
//! Política permisiva: segmentos sin `=` y headers sin `:` se descartan
//! en silencio, sin reportar nada.

use std::collections::hash_map::{self, HashMap};

/// Mapa nombre → lista ordenada de valores
///
/// Las claves repetidas acumulan valores en orden de aparición, nunca se
/// sobrescriben (salvo con [`MultiMap::set`]).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultiMap {
    entries: HashMap<String, Vec<String>>,
}

impl MultiMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Agrega un valor al final de la lista de `name`
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.entry(name.into()).or_default().push(value.into());
    }

    /// Reemplaza la lista de `name` por un único valor
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(name.into(), vec![value.into()]);
    }

    /// Primer valor de `name`
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .get(name)
            .and_then(|values| values.first())
            .map(|s| s.as_str())
    }

    /// Todos los valores de `name`, en orden de inserción
    pub fn get_all(&self, name: &str) -> Option<&[String]> {
        self.entries.get(name).map(|values| values.as_slice())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Itera sobre (nombre, valores). El orden entre claves no está definido.
    pub fn iter(&self) -> hash_map::Iter<'_, String, Vec<String>> {
        self.entries.iter()
    }
}

impl<'a> IntoIterator for &'a MultiMap {
    type Item = (&'a String, &'a Vec<String>);
    type IntoIter = hash_map::Iter<'a, String, Vec<String>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Parsea una query string (sin el `?`)
///
/// Ejemplo: "a=1&a=2&b=hello%20world"
/// Retorna: {"a": ["1", "2"], "b": ["hello world"]}
pub fn parse_query(query: &str) -> MultiMap {
    let mut params = MultiMap::new();

    for segment in query.split('&') {
        // Sin '=' no hay parámetro
        if !segment.contains('=') {
            continue;
        }

        // El segmento ya no tiene '&': form_urlencoded corta en el primer '='
        // y decodifica '%XX' (UTF-8) y '+'
        if let Some((name, value)) = url::form_urlencoded::parse(segment.as_bytes()).next() {
            params.append(name.into_owned(), value.into_owned());
        }
    }

    params
}

/// Parsea una línea de header `Nombre: Valor`
///
/// Retorna `None` si no hay `:` o si está en la posición 0.
pub fn parse_header_line(line: &str) -> Option<(&str, &str)> {
    match line.find(':') {
        Some(pos) if pos > 0 => Some((line[..pos].trim(), line[pos + 1..].trim())),
        _ => None,
    }
}

/// Agrega una línea de header al mapa, ignorando las malformadas
pub fn append_header_line(headers: &mut MultiMap, line: &str) {
    if let Some((name, value)) = parse_header_line(line) {
        headers.append(name, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_keys_keep_order() {
        let params = parse_query("a=1&a=2&b=x");

        assert_eq!(params.get_all("a"), Some(&["1".to_string(), "2".to_string()][..]));
        assert_eq!(params.get_all("b"), Some(&["x".to_string()][..]));
        assert_eq!(params.get("a"), Some("1"));
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_segments_without_equals_are_skipped() {
        let params = parse_query("debug&name=Joe&&flag");

        assert_eq!(params.len(), 1);
        assert_eq!(params.get("name"), Some("Joe"));
        assert!(!params.contains("debug"));
    }

    #[test]
    fn test_empty_value_is_kept() {
        let params = parse_query("name=");
        assert_eq!(params.get("name"), Some(""));
    }

    #[test]
    fn test_value_splits_at_first_equals() {
        let params = parse_query("expr=a=b");
        assert_eq!(params.get("expr"), Some("a=b"));
    }

    #[test]
    fn test_percent_decoding() {
        // "rock & roll" codificado
        let params = parse_query("song=rock%20%26%20roll&greeting=hola+mundo&%C3%B1=%C3%B1");

        assert_eq!(params.get("song"), Some("rock & roll"));
        assert_eq!(params.get("greeting"), Some("hola mundo"));
        assert_eq!(params.get("ñ"), Some("ñ"));
    }

    #[test]
    fn test_encoded_value_round_trip() {
        let original = "fish & chips for two";
        let encoded: String = url::form_urlencoded::byte_serialize(original.as_bytes()).collect();
        let params = parse_query(&format!("dish={}", encoded));

        assert_eq!(params.get("dish"), Some(original));
    }

    #[test]
    fn test_parse_header_line() {
        assert_eq!(parse_header_line("Host: localhost:8080"), Some(("Host", "localhost:8080")));
        assert_eq!(parse_header_line("  X-Pad  :   value  "), Some(("X-Pad", "value")));
        assert_eq!(parse_header_line("X-Empty:"), Some(("X-Empty", "")));
        assert_eq!(parse_header_line("no colon here"), None);
        assert_eq!(parse_header_line(": orphan value"), None);
    }

    #[test]
    fn test_header_values_accumulate_case_sensitive() {
        let mut headers = MultiMap::new();
        append_header_line(&mut headers, "Accept: text/html");
        append_header_line(&mut headers, "Accept: application/json");
        append_header_line(&mut headers, "accept: */*");
        append_header_line(&mut headers, "garbage");

        assert_eq!(headers.get_all("Accept").map(|v| v.len()), Some(2));
        assert_eq!(headers.get_all("Accept").unwrap()[1], "application/json");
        assert_eq!(headers.get("accept"), Some("*/*"));
        assert_eq!(headers.len(), 2);
    }

    #[test]
    fn test_set_replaces_append_accumulates() {
        let mut map = MultiMap::new();
        map.set("X", "1");
        map.set("X", "2");
        assert_eq!(map.get_all("X"), Some(&["2".to_string()][..]));

        map.append("Y", "a");
        map.append("Y", "b");
        assert_eq!(map.get_all("Y"), Some(&["a".to_string(), "b".to_string()][..]));
    }
}
