//! Cart commands.

use std::fmt::Write as _;

use boutique_core::ProductId;
use boutique_storefront::Storefront;
use boutique_storefront::cart::Cart;
use boutique_storefront::error::Result;

/// Add one unit of a catalog product.
///
/// # Errors
///
/// Returns an error if the product list cannot be fetched or does not
/// contain the product.
pub async fn add(storefront: &mut Storefront, id: ProductId) -> Result<()> {
    storefront.catalog().fetch_products().await?;
    storefront.add_to_cart(id).await
}

pub fn render(cart: &Cart) -> String {
    let mut out = String::new();

    if cart.is_empty() {
        out.push_str("Cart is empty.\n");
    }
    for item in cart.items() {
        let _ = writeln!(
            out,
            "{:>3} x {:<32} {:>10} {:>10.2}",
            item.quantity,
            item.name,
            item.unit_price,
            item.subtotal()
        );
    }

    let _ = writeln!(out, "Items:         {}", cart.total_items());
    let _ = writeln!(out, "Subtotal:      {:.2}", cart.total_price());
    let _ = writeln!(out, "Location cost: {:.2}", cart.location_cost());
    let _ = writeln!(out, "Total:         {:.2}", cart.grand_total());
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use boutique_core::Price;
    use boutique_storefront::cart::CartProduct;

    use super::*;

    #[test]
    fn test_render_cart() {
        let mut cart = Cart::new();
        cart.add_item(CartProduct {
            id: ProductId::new(1),
            name: "Runner".to_string(),
            price: Price::parse("19.99").unwrap(),
            image: None,
        });
        cart.add_item(CartProduct {
            id: ProductId::new(1),
            name: "Runner".to_string(),
            price: Price::parse("19.99").unwrap(),
            image: None,
        });
        cart.set_location_cost("5".parse().unwrap());

        let out = render(&cart);
        assert!(out.contains("2 x Runner"));
        assert!(out.contains("39.98"));
        assert!(out.contains("Items:         2"));
        assert!(out.contains("Total:         44.98"));
    }

    #[test]
    fn test_render_empty_cart() {
        let out = render(&Cart::new());
        assert!(out.starts_with("Cart is empty."));
        assert!(out.contains("Total:         0.00"));
    }
}
