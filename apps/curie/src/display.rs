//! Output rendering and formatting

use comfy_table::{presets::UTF8_FULL, Attribute, Cell, ContentArrangement, Table};
use curie_events::FailureContext;
use curie_types::Product;
use serde::Serialize;
use std::io;

/// Result of one CLI command
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum OperationResult {
    Fetched(FetchReport),
    Path(Product),
    List { products: Vec<Product> },
    Removed { key: String, removed: bool },
    Cleaned { removed: usize },
}

/// Outcome of a batch fetch
#[derive(Debug, Clone, Default, Serialize)]
pub struct FetchReport {
    pub products: Vec<Product>,
    pub failures: Vec<FetchFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FetchFailure {
    pub key: String,
    pub failure: FailureContext,
}

impl FetchReport {
    pub fn total(&self) -> usize {
        self.products.len() + self.failures.len()
    }
}

/// Output renderer for CLI results
#[derive(Clone)]
pub struct OutputRenderer {
    json_output: bool,
}

impl OutputRenderer {
    pub fn new(json_output: bool) -> Self {
        Self { json_output }
    }

    /// Render operation result to stdout
    pub fn render_result(&self, result: &OperationResult) -> io::Result<()> {
        if self.json_output {
            Self::render_json(result)
        } else {
            Self::render_text(result);
            Ok(())
        }
    }

    fn render_json(result: &OperationResult) -> io::Result<()> {
        let json = serde_json::to_string_pretty(result).map_err(io::Error::other)?;
        println!("{json}");
        Ok(())
    }

    fn render_text(result: &OperationResult) {
        match result {
            OperationResult::Fetched(report) => {
                // One line per resolved key so the output pipes cleanly
                for product in &report.products {
                    println!("{}\t{}", product.key, product.path.display());
                }
            }
            OperationResult::Path(product) => println!("{}", product.path.display()),
            OperationResult::List { products } => Self::render_product_list(products),
            OperationResult::Removed { key, removed } => {
                if *removed {
                    println!("Removed {key}");
                } else {
                    println!("{key} was not cached");
                }
            }
            OperationResult::Cleaned { removed } => {
                println!("Removed {removed} partial download(s)");
            }
        }
    }

    fn render_product_list(products: &[Product]) {
        if products.is_empty() {
            println!("No cached assets.");
            return;
        }
        println!("{}", product_table(products));
    }
}

fn product_table(products: &[Product]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("Key").add_attribute(Attribute::Bold),
        Cell::new("Path").add_attribute(Attribute::Bold),
    ]);

    for product in products {
        table.add_row(vec![
            Cell::new(product.key.as_str()),
            Cell::new(product.path.display()),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use curie_types::{AssetOrigin, ProductKey};
    use std::path::PathBuf;

    fn product(key: &str) -> Product {
        Product::new(
            ProductKey::new(key).unwrap(),
            PathBuf::from(format!("/cache/{key}.usdz")),
            AssetOrigin::Downloaded,
        )
    }

    #[test]
    fn test_fetch_report_json_shape() {
        let report = FetchReport {
            products: vec![product("abc")],
            failures: vec![FetchFailure {
                key: "def".to_string(),
                failure: FailureContext::new(None::<String>, "boom", None::<String>, false),
            }],
        };
        assert_eq!(report.total(), 2);
        let json = serde_json::to_value(OperationResult::Fetched(report)).unwrap();
        assert_eq!(json["result"], "fetched");
        assert_eq!(json["products"][0]["key"], "abc");
        assert_eq!(json["products"][0]["origin"], "downloaded");
        assert_eq!(json["failures"][0]["failure"]["message"], "boom");
    }

    #[test]
    fn test_product_table_lists_every_key() {
        let table = product_table(&[product("abc"), product("def")]).to_string();
        assert!(table.contains("abc"));
        assert!(table.contains("/cache/def.usdz"));
    }
}
