use std::time::Instant;

use anyhow::{bail, Result};

use bookmark::{lookup, Filters};

use super::Context;

/// Returns `false` if any retailer failed.
pub async fn cmd_selftest(ctx: &Context, only: Option<&str>) -> Result<bool> {
    let retailers: Vec<_> = match only {
        Some(name) => match ctx.registry.get(name) {
            Some(r) => vec![r.clone()],
            None => bail!(
                "unknown retailer '{name}' (registered: {})",
                ctx.registry.names().join(", ")
            ),
        },
        None => ctx.registry.iter().cloned().collect(),
    };

    println!("🧪 Retailer self-test\n");
    let timeout = ctx.config.retailer_timeout();
    let filters = Filters::default();
    let mut failures = 0usize;

    for retailer in &retailers {
        let isbn = retailer.self_test_isbn();
        print!("   {:<14} {} ... ", retailer.name(), isbn);

        let start = Instant::now();
        let call = lookup(retailer.as_ref(), &isbn, &filters, ctx.client.as_ref());
        let result = tokio::time::timeout(timeout, call).await;
        let elapsed = start.elapsed();

        match result {
            Ok(Ok(book)) => println!(
                "✅ ${:.2} {} {} ({:.1}s)",
                book.price,
                book.medium,
                book.condition,
                elapsed.as_secs_f64()
            ),
            Ok(Err(failure)) => {
                failures += 1;
                println!("❌ {}", failure.reason);
            }
            Err(_) => {
                failures += 1;
                println!("❌ timed out after {}s", timeout.as_secs());
            }
        }
    }

    println!("\n{} passed, {} failed", retailers.len() - failures, failures);
    Ok(failures == 0)
}
