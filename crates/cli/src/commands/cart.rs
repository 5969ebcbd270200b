//! Cart commands: show, add, remove and update.
//!
//! Mutations go through [`CartEngine`], which persists the new cart before
//! returning. Rejected mutations have already been logged and surfaced as a
//! notice by the engine; the error is passed up only to set the exit code.

use rocketshoes_cart::{CartEngine, Outcome};
use rocketshoes_core::{Cart, ProductId};
use tracing::info;

/// Print the current cart.
///
/// # Errors
///
/// Returns an error if the cart cannot be serialized to JSON.
#[allow(clippy::print_stdout)]
pub fn show(engine: &CartEngine, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let cart = engine.cart();

    if json {
        println!("{}", serde_json::to_string_pretty(cart.as_ref())?);
    } else {
        println!("{}", render(&cart));
    }

    Ok(())
}

/// Add one unit of a product.
///
/// # Errors
///
/// Returns the engine's error if the product could not be added.
pub async fn add(
    engine: &CartEngine,
    product_id: ProductId,
) -> Result<(), Box<dyn std::error::Error>> {
    engine.add_product(product_id).await?;
    report_line(engine, product_id);
    Ok(())
}

/// Remove a product's line.
///
/// # Errors
///
/// Returns the engine's error if the product is not in the cart or the
/// new cart could not be saved.
pub async fn remove(
    engine: &CartEngine,
    product_id: ProductId,
) -> Result<(), Box<dyn std::error::Error>> {
    engine.remove_product(product_id).await?;
    info!(product_id = %product_id, "Removed from cart");
    Ok(())
}

/// Set a product's quantity.
///
/// # Errors
///
/// Returns the engine's error if the quantity was rejected.
pub async fn update(
    engine: &CartEngine,
    product_id: ProductId,
    amount: i64,
) -> Result<(), Box<dyn std::error::Error>> {
    match engine.update_product_amount(product_id, amount).await? {
        Outcome::Committed => report_line(engine, product_id),
        Outcome::Skipped => info!(amount, "Quantity must be at least 1, nothing changed"),
    }
    Ok(())
}

fn report_line(engine: &CartEngine, product_id: ProductId) {
    if let Some(line) = engine.cart().line(product_id) {
        info!(
            product_id = %product_id,
            name = %line.name,
            amount = line.amount,
            "Cart updated"
        );
    }
}

/// Render the cart as a plain-text table.
fn render(cart: &Cart) -> String {
    if cart.is_empty() {
        return "Cart is empty".to_string();
    }

    let row = |id: &str, name: &str, price: &str, qty: &str| {
        format!("{id:>6}  {name:<32}  {price:>10}  {qty:>6}")
    };

    let mut rows = vec![row("ID", "PRODUCT", "PRICE", "QTY")];
    rows.extend(cart.iter().map(|line| {
        row(
            &line.product_id.to_string(),
            &truncate(&line.name, 32),
            &line.price.display(),
            &line.amount.to_string(),
        )
    }));
    rows.push(format!(
        "{} item(s), {} unit(s)",
        cart.len(),
        cart.total_units()
    ));

    rows.join("\n")
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::num::NonZeroU32;

    use rocketshoes_core::{CartLine, Price, Product};

    use super::*;

    fn cart() -> Cart {
        let product = Product {
            id: ProductId::new(1),
            name: "Tênis de Caminhada Leve Confortável".to_string(),
            price: Price::from_cents(17990),
            image_url: "https://cdn.example.com/1.jpg".to_string(),
        };
        Cart::new().with_line(CartLine::from_product(product, NonZeroU32::new(2).unwrap()))
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(render(&Cart::new()), "Cart is empty");
    }

    #[test]
    fn test_render_lines_and_units() {
        let out = render(&cart());
        assert!(out.contains("$179.90"));
        assert!(out.contains("Tênis de Caminhada Leve Confort…"));
        assert!(out.ends_with("1 item(s), 2 unit(s)"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 5), "abcd…");
    }
}
