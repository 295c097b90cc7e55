//! Products command - browse the catalog

use crate::context::Context;
use anyhow::Result;
use clap::{Subcommand, ValueEnum};
use owo_colors::OwoColorize;
use storefront_api_client::endpoints::products::{
    ListProductsParams, Product, ProductPage, ProductSort, MAX_PAGE_SIZE,
};
use storefront_cli::output::{format_count, format_money, Status};
use storefront_core::cache::QueryKey;

#[derive(Subcommand)]
pub enum ProductsCommand {
    /// List products, one page at a time
    List {
        /// 1-based page
        #[arg(short, long, default_value = "1")]
        page: u32,

        /// Page size (at most 50)
        #[arg(short, long, default_value = "20")]
        limit: u32,

        /// Only this category
        #[arg(short, long)]
        category: Option<String>,

        /// Free-text search
        #[arg(short, long)]
        search: Option<String>,

        /// Sort order
        #[arg(long, value_enum)]
        sort: Option<SortArg>,
    },

    /// Show one product
    Show {
        /// Product id
        id: i64,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SortArg {
    Newest,
    PriceAsc,
    PriceDesc,
    Rating,
}

impl From<SortArg> for ProductSort {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Newest => Self::Newest,
            SortArg::PriceAsc => Self::PriceAsc,
            SortArg::PriceDesc => Self::PriceDesc,
            SortArg::Rating => Self::Rating,
        }
    }
}

pub async fn run(ctx: &Context, command: ProductsCommand) -> Result<()> {
    match command {
        ProductsCommand::List {
            page,
            limit,
            category,
            search,
            sort,
        } => {
            let mut params = ListProductsParams::new()
                .with_page(page)
                .with_limit(limit.min(MAX_PAGE_SIZE));
            if let Some(category) = category {
                params = params.with_category(category);
            }
            if let Some(search) = search {
                params = params.with_search(search);
            }
            if let Some(sort) = sort {
                params = params.with_sort(sort.into());
            }
            list(ctx, params).await
        }
        ProductsCommand::Show { id } => show(ctx, id).await,
    }
}

async fn list(ctx: &Context, params: ListProductsParams) -> Result<()> {
    let products = ctx.client.products();
    let key = params.query_key();

    let page: ProductPage = ctx
        .orchestrator
        .run_query(key, move || {
            let products = products.clone();
            let params = params.clone();
            async move { products.list(&params).await }
        })
        .await
        .into_result()?;

    ctx.emit(&page, |page| {
        if page.data.is_empty() {
            Status::info("No products match");
            return;
        }

        Status::header(&format!(
            "Page {} · {}",
            page.page,
            format_count(usize::try_from(page.total).unwrap_or(usize::MAX), "product", "products")
        ));
        println!(
            "  {:<8} {:<32} {:>10} {:>7}",
            "ID".dimmed(),
            "Name".dimmed(),
            "Price".dimmed(),
            "Stock".dimmed()
        );
        for product in &page.data {
            print_row(product);
        }
    })
}

async fn show(ctx: &Context, id: i64) -> Result<()> {
    let products = ctx.client.products();

    let product: Product = ctx
        .orchestrator
        .run_query(QueryKey::from("products").push(id.to_string()), move || {
            let products = products.clone();
            async move { products.get(id).await }
        })
        .await
        .into_result()?;

    ctx.emit(&product, |product| {
        Status::header(&product.name);
        println!("  {:<12} {}", "ID".dimmed(), product.id);
        println!("  {:<12} {}", "Price".dimmed(), format_money(product.price));
        if let Some(category) = &product.category {
            println!("  {:<12} {category}", "Category".dimmed());
        }
        if let Some(rating) = product.rating {
            println!("  {:<12} {rating:.1}/5", "Rating".dimmed());
        }
        println!(
            "  {:<12} {}",
            "Stock".dimmed(),
            if product.in_stock() {
                product.stock.to_string().green().to_string()
            } else {
                "out of stock".red().to_string()
            }
        );
        println!("  {:<12} {}", "Variants".dimmed(), product.variants.len());
        if let Some(description) = &product.description {
            println!();
            println!("  {description}");
        }
    })
}

fn print_row(product: &Product) {
    let stock = if product.in_stock() {
        product.stock.to_string()
    } else {
        "-".to_string()
    };
    println!(
        "  {:<8} {:<32} {:>10} {:>7}",
        product.id,
        truncate(&product.name, 32),
        format_money(product.price),
        stock
    );
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
    cut.push('…');
    cut
}
