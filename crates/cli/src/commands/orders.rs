//! Checkout and tracking commands.

use sneakershelf_client::Storefront;
use sneakershelf_client::forms::CheckoutDraft;
use tracing::info;

use super::CliError;

/// Place an order for the current cart.
///
/// # Errors
///
/// Returns an error if validation fails or the backend refuses the order.
pub async fn checkout(storefront: &Storefront, draft: &CheckoutDraft) -> Result<(), CliError> {
    let order = storefront.checkout(draft).await?;

    info!("Order {} placed", order.order_number);
    for line in &order.items {
        let name = line
            .product
            .as_ref()
            .map_or("(product)", |product| product.name.as_str());
        info!("  {name} x{} @ ${:.2}", line.quantity, line.price);
    }
    info!(
        "Subtotal ${:.2} + shipping ${:.2} = ${:.2}",
        order.subtotal, order.shipping_cost, order.total
    );
    Ok(())
}

/// Show an order's status.
///
/// # Errors
///
/// Returns an error if the order is unknown or the backend is unreachable.
pub async fn track(storefront: &Storefront, order_number: &str) -> Result<(), CliError> {
    let tracking = storefront.track_order(order_number).await?;

    info!(
        "Order {}: {} ({} item(s), total ${:.2})",
        tracking.order_number, tracking.status_display, tracking.items_count, tracking.total
    );
    info!(
        "Placed {}, last updated {}",
        tracking.created_at.format("%Y-%m-%d %H:%M UTC"),
        tracking.updated_at.format("%Y-%m-%d %H:%M UTC")
    );
    Ok(())
}
