use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tera::{Context as TeraContext, Tera};

use crate::error::RenderError;
use crate::loader::load_records;
use crate::types::ProductRecord;
use crate::utils::{osc8_file_link, write_atomic};

/// Sort by (category, product_pn); equal keys keep their table order
pub fn sort_records(mut records: Vec<ProductRecord>) -> Vec<ProductRecord> {
    records.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    records
}

/// Unique non-empty categories, in order of first appearance
pub fn derive_categories(records: &[ProductRecord]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut categories = Vec::new();

    for record in records {
        let Some(category) = record.category() else {
            continue;
        };
        if !category.is_empty() && seen.insert(category) {
            categories.push(category.to_string());
        }
    }

    categories
}

/// Render the catalog template with `products` and `categories` bound.
///
/// Autoescaping is off: values are inserted into the HTML verbatim.
pub fn render(
    template: &str,
    records: &[ProductRecord],
    categories: &[String],
) -> Result<String, RenderError> {
    let mut context = TeraContext::new();
    context.insert("products", records);
    context.insert("categories", categories);

    Ok(Tera::one_off(template, &context, false)?)
}

/// Main generation function
pub fn run_generate(input: &Path, template: &Path, output: &Path) -> Result<()> {
    let table = load_records(input).context("Error loading CSV")?;
    println!("Successfully read CSV with {} encoding", table.encoding);
    println!("Found columns: {}", table.columns().join(", "));

    let products = sort_records(table.records);
    let categories = derive_categories(&products);

    let template_text = fs::read_to_string(template)
        .with_context(|| format!("Failed to read template: {}", template.display()))?;
    let html = render(&template_text, &products, &categories)
        .with_context(|| format!("Failed to render template: {}", template.display()))?;

    // Only written once rendering has fully succeeded
    write_atomic(output, html.as_bytes())?;

    let output_str = output.display().to_string();
    println!(
        "\nGenerated {} with {} products",
        osc8_file_link(output, &output_str),
        products.len()
    );
    println!("Categories: {}", categories.join(", "));
    println!("\nProducts included:");
    for product in &products {
        println!(
            "  - {}: {} ({})",
            product.product_pn().unwrap_or(""),
            product.product_name().unwrap_or(""),
            product.category().unwrap_or("N/A")
        );
    }

    Ok(())
}
