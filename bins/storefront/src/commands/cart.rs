//! Cart command - inspect and edit cart lines

use crate::context::Context;
use anyhow::Result;
use clap::Subcommand;
use owo_colors::OwoColorize;
use serde::Serialize;
use serde_json::{json, Map, Value};
use storefront_api_client::endpoints::cart::{Cart, CartLine, CartLineTracker, CART_QUERY_KEY};
use storefront_cli::output::{format_count, format_money, print_json, render_totals, Status};
use storefront_cli::OutputFormat;
use storefront_core::pricing::{CartTotals, PricedLine};
use storefront_core::AppError;

#[derive(Subcommand)]
pub enum CartCommand {
    /// Show cart lines and totals
    Show,

    /// Add a variant to the cart
    Add {
        /// Variant id
        variant_id: i64,

        /// Quantity to add
        #[arg(short, long, default_value = "1")]
        quantity: u32,
    },

    /// Set a line's quantity; zero removes the line
    Update {
        /// Cart line id
        item_id: i64,

        /// New quantity
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },

    /// Remove a line
    Remove {
        /// Cart line id
        item_id: i64,
    },

    /// Price lines offline, e.g. `2x19.99 1x5`
    Totals {
        /// Lines as QUANTITYxUNIT_PRICE
        #[arg(required = true)]
        lines: Vec<String>,
    },
}

#[derive(Serialize)]
struct CartView<'a> {
    items: &'a [CartLine],
    totals: CartTotals,
}

pub async fn run(ctx: &Context, command: CartCommand) -> Result<()> {
    match command {
        CartCommand::Show => show(ctx).await,
        CartCommand::Add {
            variant_id,
            quantity,
        } => add(ctx, variant_id, quantity).await,
        CartCommand::Update { item_id, quantity } => update(ctx, item_id, quantity).await,
        CartCommand::Remove { item_id } => remove(ctx, item_id).await,
        CartCommand::Totals { lines } => totals(&lines, ctx.format),
    }
}

async fn show(ctx: &Context) -> Result<()> {
    let api = ctx.client.cart();

    let cart: Cart = ctx
        .orchestrator
        .run_query(CART_QUERY_KEY, move || {
            let api = api.clone();
            async move { api.get_cart().await }
        })
        .await
        .into_result()?;

    let view = CartView {
        items: &cart.items,
        totals: cart.totals(),
    };
    ctx.emit(&view, |view| {
        if view.items.is_empty() {
            Status::info("Your cart is empty");
            return;
        }

        Status::header(&format!("Cart · {}", format_count(view.items.len(), "line", "lines")));
        println!(
            "  {:<8} {:<10} {:>5} {:>10} {:>12}",
            "Line".dimmed(),
            "Variant".dimmed(),
            "Qty".dimmed(),
            "Price".dimmed(),
            "Line total".dimmed()
        );
        for line in view.items {
            println!(
                "  {:<8} {:<10} {:>5} {:>10} {:>12}",
                line.id,
                line.variant_id.map_or_else(|| "-".to_string(), |id| id.to_string()),
                line.quantity,
                format_money(line.unit_price),
                format_money(line.line_total())
            );
        }
        println!();
        for row in render_totals(&view.totals) {
            println!("  {row}");
        }
    })
}

async fn add(ctx: &Context, variant_id: i64, quantity: u32) -> Result<()> {
    let api = ctx.client.cart();
    let add = ctx
        .orchestrator
        .run_mutation(move |(variant_id, quantity): (i64, u32)| {
            let api = api.clone();
            async move { api.add_to_cart(variant_id, quantity).await }
        })
        .invalidates(CART_QUERY_KEY)
        .with_retry(ctx.client.config().mutation_retry.clone());

    let line = add.mutate((variant_id, quantity)).await?;

    ctx.emit(&line, |line| {
        Status::success(&format!(
            "Added {} of variant {variant_id} (line {})",
            line.quantity, line.id
        ));
    })
}

async fn update(ctx: &Context, item_id: i64, quantity: i64) -> Result<()> {
    let tracker = CartLineTracker::for_client(&ctx.client, &ctx.orchestrator);
    let line = tracker.update_quantity(item_id, quantity).await?;

    ctx.emit(&line, |line| match line {
        Some(line) => Status::success(&format!("Line {} now has quantity {}", line.id, line.quantity)),
        None => Status::success(&format!("Removed line {item_id}")),
    })
}

async fn remove(ctx: &Context, item_id: i64) -> Result<()> {
    let tracker = CartLineTracker::for_client(&ctx.client, &ctx.orchestrator);
    tracker.remove_item(item_id).await?;

    if ctx.is_json() {
        print_json(&json!({ "removed": item_id }))?;
    } else {
        Status::success(&format!("Removed line {item_id}"));
    }
    Ok(())
}

/// Price `lines` without touching the network
pub fn totals(lines: &[String], format: OutputFormat) -> Result<()> {
    let parsed = parse_lines(lines)?;
    let totals = CartTotals::from_lines(&parsed);

    match format {
        OutputFormat::Json => print_json(&totals)?,
        OutputFormat::Text => {
            for row in render_totals(&totals) {
                println!("{row}");
            }
        }
    }
    Ok(())
}

/// Parse every `QUANTITYxPRICE` argument, reporting all bad ones at once
fn parse_lines(lines: &[String]) -> Result<Vec<(u32, f64)>, AppError> {
    let mut parsed = Vec::with_capacity(lines.len());
    let mut errors = Vec::new();
    let mut field_errors = Map::new();

    for (index, raw) in lines.iter().enumerate() {
        match parse_line(raw) {
            Ok(line) => parsed.push(line),
            Err(reason) => {
                let field = format!("lines.{index}");
                errors.push(format!("{field}: {raw}: {reason}"));
                field_errors.insert(field, Value::String(format!("{raw}: {reason}")));
            }
        }
    }

    if errors.is_empty() {
        Ok(parsed)
    } else {
        Err(AppError::validation(
            format!("Validation failed: {}", errors.join("; ")),
            errors,
            field_errors,
        ))
    }
}

fn parse_line(raw: &str) -> Result<(u32, f64), &'static str> {
    let (quantity, price) = raw
        .split_once(['x', 'X'])
        .ok_or("expected QUANTITYxPRICE")?;
    let quantity: u32 = quantity
        .trim()
        .parse()
        .map_err(|_| "quantity must be a whole number")?;
    let price: f64 = price.trim().parse().map_err(|_| "price must be a number")?;

    if quantity == 0 {
        return Err("quantity must be at least 1");
    }
    if !price.is_finite() || price < 0.0 {
        return Err("price must be zero or more");
    }
    Ok((quantity, price))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_parse_line() {
        assert_eq!(parse_line("2x19.99"), Ok((2, 19.99)));
        assert_eq!(parse_line("1X5"), Ok((1, 5.0)));
        assert!(parse_line("2*19.99").is_err());
        assert!(parse_line("0x10").is_err());
        assert!(parse_line("1x-3").is_err());
    }

    #[test]
    fn test_parse_lines_collects_every_error() {
        let err = parse_lines(&strings(&["2x10", "abc", "1xfree"])).unwrap_err();
        assert!(err.is_validation());
        assert!(err.details.is_some());
        assert!(err.message.contains("lines.1"));
        assert!(err.message.contains("lines.2"));
    }

    #[test]
    fn test_totals_from_parsed_lines() {
        let lines = parse_lines(&strings(&["2x100", "1x50"])).unwrap();
        let totals = CartTotals::from_lines(&lines);
        assert!((totals.subtotal - 250.0).abs() < 1e-9);
        assert!((totals.total - 324.99).abs() < 1e-9);
    }
}
