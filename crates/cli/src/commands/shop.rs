//! Catalog, cart, and order commands.

use autoparts_core::{OrderTotal, ProductId};
use autoparts_storefront::StorefrontContext;
use autoparts_storefront::cart::CartError;
use autoparts_storefront::catalog::{CatalogError, ProductFilter};
use autoparts_storefront::checkout::{CheckoutError, CheckoutOptions};

use super::money;

#[allow(clippy::print_stdout)]
pub async fn products(
    ctx: &StorefrontContext,
    search: Option<String>,
    category: Option<String>,
) -> Result<(), CatalogError> {
    let filter = ProductFilter::new(search, category);
    let products = ctx.catalog().search(&filter).await?;

    if products.is_empty() {
        println!("No products found");
        return Ok(());
    }
    for product in &products {
        println!(
            "{:>6}  {:<40} {:>10}  {}",
            product.id,
            product.name,
            money(product.price),
            product.category.as_deref().unwrap_or("-"),
        );
    }
    if filter.is_active() {
        println!("{} product(s) found", products.len());
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
pub async fn categories(ctx: &StorefrontContext) -> Result<(), CatalogError> {
    for category in ctx.catalog().categories().await? {
        println!("{category}");
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
pub async fn product(ctx: &StorefrontContext, id: i64) -> Result<(), CatalogError> {
    let product = ctx.catalog().get_product(ProductId::new(id)).await?;
    let image = ctx.images().slot(product.image_url.as_deref());

    println!("{} (#{})", product.name, product.id);
    println!("Price:    {}", money(product.price));
    println!("Category: {}", product.category.as_deref().unwrap_or("-"));
    match product.stock_quantity {
        Some(stock) => println!("Stock:    {stock}"),
        None => println!("Stock:    unknown"),
    }
    if image.is_placeholder() {
        println!("Image:    none");
    } else {
        println!("Image:    {}", image.src());
    }
    if let Some(description) = product.description.as_deref().filter(|d| !d.is_empty()) {
        println!();
        println!("{description}");
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
pub async fn show_cart(ctx: &StorefrontContext) {
    ctx.start().await;
    let cart = ctx.cart().snapshot();

    if cart.is_empty() {
        println!("Your cart is empty");
        return;
    }
    for line in cart.lines() {
        println!(
            "{:>6}  {:<40} x{:<3} {:>10}",
            line.product_id,
            line.product.name,
            line.quantity,
            money(line.line_total()),
        );
    }
    let summary = cart.summary();
    println!("Subtotal: {}", money(summary.subtotal));
    println!("Tax:      {}", money(summary.tax));
    println!("Total:    {}", money(summary.total));
}

#[allow(clippy::print_stdout)]
pub async fn add_to_cart(ctx: &StorefrontContext, product_id: i64, quantity: u32) -> Result<(), CartError> {
    ctx.add_to_cart(ProductId::new(product_id), quantity).await?;
    println!("Added to cart. Cart: {} item(s)", ctx.cart().count());
    Ok(())
}

#[allow(clippy::print_stdout)]
pub async fn checkout(
    ctx: &StorefrontContext,
    shipping_address: Option<String>,
    payment_method: Option<String>,
    notes: Option<String>,
) -> Result<(), CheckoutError> {
    ctx.start().await;
    let options = CheckoutOptions {
        shipping_address,
        payment_method,
        notes,
    };
    match ctx.checkout(&options).await? {
        Some(order) => match order.id {
            Some(id) => println!("Order #{id} placed successfully!"),
            None => println!("Order placed successfully!"),
        },
        None => println!("Order placed successfully!"),
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
pub async fn orders(ctx: &StorefrontContext) -> Result<(), CheckoutError> {
    let orders = ctx.order_history().await?;
    print_orders(&orders);
    Ok(())
}

#[allow(clippy::print_stdout)]
pub(super) fn print_orders(orders: &[autoparts_core::Order]) {
    if orders.is_empty() {
        println!("No orders found");
        return;
    }

    for order in orders {
        let id = order
            .id
            .map_or_else(|| "N/A".to_string(), |id| id.to_string());
        let date = order.placed_at.map_or_else(
            || "Date not available".to_string(),
            |d| d.format("%B %-d, %Y %H:%M").to_string(),
        );
        let total = match order.total() {
            OrderTotal::Reported(amount) => money(amount),
            OrderTotal::ComputedFromItems(amount) => format!("{} (from items)", money(amount)),
            OrderTotal::Unavailable => money(rust_decimal::Decimal::ZERO),
        };

        println!("Order #{id}  {date}  {}  {total}", order.status);
        for item in &order.items {
            println!(
                "    {} x {}  {}",
                item.name,
                item.quantity,
                money(item.line_total())
            );
        }
    }
}
