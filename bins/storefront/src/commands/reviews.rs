//! Reviews command - read and submit product reviews

use crate::context::Context;
use anyhow::Result;
use clap::Subcommand;
use owo_colors::OwoColorize;
use storefront_api_client::endpoints::reviews::{NewReview, Review};
use storefront_cli::output::{format_count, Status};
use storefront_core::cache::QueryKey;

#[derive(Subcommand)]
pub enum ReviewsCommand {
    /// List reviews for a product
    List {
        /// Product id
        product_id: i64,
    },

    /// Review a product
    Add {
        /// Product id
        product_id: i64,

        /// Rating from 1 to 5
        #[arg(short, long)]
        rating: u8,

        /// Between 10 and 1000 characters
        #[arg(short, long)]
        comment: String,
    },
}

fn reviews_key(product_id: i64) -> QueryKey {
    QueryKey::from("reviews").push(product_id.to_string())
}

pub async fn run(ctx: &Context, command: ReviewsCommand) -> Result<()> {
    match command {
        ReviewsCommand::List { product_id } => list(ctx, product_id).await,
        ReviewsCommand::Add {
            product_id,
            rating,
            comment,
        } => add(ctx, product_id, NewReview { rating, comment }).await,
    }
}

async fn list(ctx: &Context, product_id: i64) -> Result<()> {
    let api = ctx.client.reviews();

    let reviews: Vec<Review> = ctx
        .orchestrator
        .run_query(reviews_key(product_id), move || {
            let api = api.clone();
            async move { api.list(product_id).await }
        })
        .await
        .into_result()?;

    ctx.emit(&reviews, |reviews| {
        if reviews.is_empty() {
            Status::info(&format!("No reviews for product {product_id} yet"));
            return;
        }

        Status::header(&format!(
            "Product {product_id} · {}",
            format_count(reviews.len(), "review", "reviews")
        ));
        for review in reviews {
            println!(
                "  {} {}",
                stars(review.rating).yellow(),
                review.author.as_deref().unwrap_or("anonymous").dimmed()
            );
            println!("    {}", review.comment);
        }
    })
}

async fn add(ctx: &Context, product_id: i64, review: NewReview) -> Result<()> {
    let api = ctx.client.reviews();
    let create = ctx
        .orchestrator
        .run_mutation(move |review: NewReview| {
            let api = api.clone();
            async move { api.create(product_id, &review).await }
        })
        .invalidates(reviews_key(product_id));

    let created = create.mutate(review).await?;

    ctx.emit(&created, |created| {
        Status::success(&format!(
            "Posted review {} ({}) for product {product_id}",
            created.id,
            stars(created.rating)
        ));
    })
}

fn stars(rating: u8) -> String {
    let filled = usize::from(rating.min(5));
    format!("{}{}", "★".repeat(filled), "☆".repeat(5 - filled))
}
