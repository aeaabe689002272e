//! Cart commands.

use sneakershelf_client::Storefront;
use sneakershelf_client::cart::Cart;
use sneakershelf_core::{CartItemId, ProductId, SizeId};
use tracing::info;

use super::CliError;

/// Print the cart.
pub fn show(storefront: &Storefront) {
    print_cart(&storefront.cart().snapshot());
}

/// Add a product to the cart.
///
/// # Errors
///
/// Returns an error if the quantity is invalid or the backend refuses.
pub async fn add(
    storefront: &Storefront,
    product: &str,
    size: Option<&str>,
    quantity: i64,
) -> Result<(), CliError> {
    let size = size.map(SizeId::new);
    let cart = storefront
        .cart()
        .add_item(&ProductId::new(product), size.as_ref(), quantity)
        .await?;
    print_cart(&cart);
    Ok(())
}

/// Set a line's quantity.
///
/// # Errors
///
/// Returns an error if the backend refuses the update.
pub async fn update(storefront: &Storefront, item: &str, quantity: i64) -> Result<(), CliError> {
    let cart = storefront
        .cart()
        .update_item(&CartItemId::new(item), quantity)
        .await?;
    print_cart(&cart);
    Ok(())
}

/// Remove a line.
///
/// # Errors
///
/// Returns an error if the backend refuses the removal.
pub async fn remove(storefront: &Storefront, item: &str) -> Result<(), CliError> {
    let cart = storefront.cart().remove_item(&CartItemId::new(item)).await?;
    print_cart(&cart);
    Ok(())
}

/// Empty the cart.
///
/// # Errors
///
/// Returns an error if the backend refuses.
pub async fn clear(storefront: &Storefront) -> Result<(), CliError> {
    let cart = storefront.cart().clear().await?;
    print_cart(&cart);
    Ok(())
}

fn print_cart(cart: &Cart) {
    if cart.is_empty() {
        info!("Cart is empty");
        return;
    }

    for item in cart.items() {
        let name = item
            .product_name
            .as_deref()
            .unwrap_or_else(|| item.product_id.as_str());
        let size = item
            .size_label
            .as_deref()
            .or_else(|| item.size_id.as_ref().map(SizeId::as_str))
            .unwrap_or("-");
        info!(
            "[{}] {name} (size {size}) x{} @ {} = {}",
            item.item_id,
            item.quantity,
            item.unit_price,
            item.line_total()
        );
    }
    info!(
        "{} item(s), subtotal {}",
        cart.total_quantity(),
        cart.subtotal()
    );
}
