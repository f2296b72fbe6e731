use anyhow::Result;
use serde::Serialize;

use bookmark::Book;

/// Print `value` as pretty JSON on stdout.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_book(book: &Book) {
    println!("📖 {}", book.title);
    println!("   Retailer:  {}", book.retailer);
    println!("   Price:     ${:.2}", book.price);
    println!("   Condition: {}", book.condition);
    println!("   Medium:    {}", book.medium);
    println!("   Link:      {}", book.link);
    if let Some(description) = &book.description {
        println!("   About:     {}", truncate_text(description, 160));
    }
}

/// Truncate on a character boundary, appending `...`.
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{cut}...")
}
