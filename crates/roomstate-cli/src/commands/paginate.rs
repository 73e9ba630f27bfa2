//! `roomstate paginate`

use anyhow::{bail, Result};
use roomstate_core::{paginate, Page, StoreConfig};
use serde_json::Value;
use std::path::Path;

/// Normalize a page payload (or a bare item array) into a collection.
pub fn run(path: &Path, by_name: bool, config: &StoreConfig) -> Result<String> {
    let page: Page<Value> = match crate::read_json(path)? {
        Value::Array(items) => Page::from_items(items),
        value @ Value::Object(_) => serde_json::from_value(value)?,
        other => bail!("Expected a page object or an item array, got {other}"),
    };

    let collection = paginate(page, &config.paginate_options(by_name));
    tracing::info!(entities = collection.len(), by_name, "paginated");
    crate::to_pretty(&collection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use roomstate_testkit::page_of;
    use std::io::Write;

    fn write_json(value: &Value) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{value}").unwrap();
        file
    }

    #[test]
    fn test_page_is_normalized_in_server_order() {
        let file = write_json(&page_of(&["b", "a", "b"], Some(true), Some("c1")));
        let out: Value =
            serde_json::from_str(&run(file.path(), false, &StoreConfig::default()).unwrap())
                .unwrap();

        assert_eq!(out["allIds"], serde_json::json!(["b", "a"]));
        assert_eq!(out["paginationInfo"]["hasNextPage"], true);
        assert_eq!(out["paginationInfo"]["cursor"], "c1");
    }

    #[test]
    fn test_bare_array_with_slugs() {
        let file = write_json(&serde_json::json!([
            {"id": "1", "name": "Foo"},
            {"id": "2", "name": "Foo"}
        ]));
        let out: Value =
            serde_json::from_str(&run(file.path(), true, &StoreConfig::default()).unwrap())
                .unwrap();

        assert_eq!(out["byName"]["foo"], "1");
        assert_eq!(out["byName"]["foo-2"], "2");
    }

    #[test]
    fn test_scalar_input_is_rejected() {
        let file = write_json(&serde_json::json!(42));
        assert!(run(file.path(), false, &StoreConfig::default()).is_err());
    }
}
