use std::time::Instant;

use anyhow::Result;
use serde::Serialize;

use bookmark::{Filters, Isbn, Outcome};

use super::output::{print_book, print_json};
use super::Context;
use crate::OutputFormat;

pub async fn cmd_find(ctx: &Context, isbn: &Isbn, filters: &Filters, format: OutputFormat) -> Result<()> {
    let service = ctx.search_service();
    let start = Instant::now();
    let best = service.search_by_isbn(isbn.as_str(), filters).await?;
    let elapsed = start.elapsed();

    match format {
        OutputFormat::Json => print_json(&best)?,
        OutputFormat::Text => match &best {
            Some(book) => {
                print_book(book);
                println!(
                    "\n({} retailers searched in {:.1}s)",
                    ctx.registry.len(),
                    elapsed.as_secs_f64()
                );
            }
            None => println!("No offer found for ISBN {isbn}"),
        },
    }
    Ok(())
}

#[derive(Serialize)]
struct SurveyReport<'a> {
    isbn: &'a Isbn,
    searched_at: String,
    outcomes: &'a [Outcome],
}

pub async fn cmd_survey(ctx: &Context, isbn: &Isbn, filters: &Filters, format: OutputFormat) -> Result<()> {
    let outcomes = ctx.coordinator().survey(isbn.as_str(), filters).await?;

    match format {
        OutputFormat::Json => print_json(&SurveyReport {
            isbn,
            searched_at: chrono::Utc::now().to_rfc3339(),
            outcomes: &outcomes,
        })?,
        OutputFormat::Text => {
            for outcome in &outcomes {
                match &outcome.result {
                    Ok(book) => println!(
                        "✅ {:<14} ${:>8.2}  {} {}  {}",
                        outcome.retailer, book.price, book.condition, book.medium, book.title
                    ),
                    Err(failure) => println!("❌ {:<14} {}", outcome.retailer, failure.reason),
                }
            }
            let found = outcomes.iter().filter_map(Outcome::book).count();
            if found == 0 {
                println!("\nNo offer found for ISBN {isbn}");
            } else {
                println!("\n{found} of {} retailers returned an offer", outcomes.len());
            }
        }
    }
    Ok(())
}
