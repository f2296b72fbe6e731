use anyhow::Result;
use serde::Serialize;

use bookmark::TitleMatch;

use super::output::{print_book, print_json};
use super::Context;
use crate::OutputFormat;

#[derive(Serialize)]
struct SearchReport<'a> {
    query: &'a str,
    searched_at: String,
    matches: &'a [TitleMatch],
}

pub async fn cmd_search(ctx: &Context, title: &str, max_results: usize, format: OutputFormat) -> Result<()> {
    let matches = ctx.search_service().search_by_title(title, max_results).await;

    if let OutputFormat::Json = format {
        return print_json(&SearchReport {
            query: title,
            searched_at: chrono::Utc::now().to_rfc3339(),
            matches: &matches,
        });
    }

    if matches.is_empty() {
        println!("No books found for \"{title}\"");
        return Ok(());
    }

    for (i, m) in matches.iter().enumerate() {
        println!("{}. {} by {} (ISBN {})", i + 1, m.volume.title, m.volume.author, m.volume.isbn);
        match &m.best {
            Some(book) => print_book(book),
            None => println!("   No offer found"),
        }
        println!();
    }
    Ok(())
}
