//! Contract checks every registered retailer must satisfy.

use std::time::Duration;

use bookmark::{lookup, AcceleratedClient, Filters, FixtureFetcher, Isbn, RetailerRegistry};

#[tokio::test]
async fn every_retailer_rejects_negative_isbn() {
    let fetcher = FixtureFetcher::new();
    for retailer in RetailerRegistry::builtin().iter() {
        let result = lookup(retailer.as_ref(), -20_435_223_542_i64, &Filters::default(), &fetcher).await;
        let failure = result.expect_err(retailer.name());
        assert_eq!(failure.retailer, retailer.name());
        assert!(failure.reason.contains("invalid ISBN"), "{}", failure.reason);
    }
}

#[tokio::test]
async fn every_retailer_rejects_malformed_isbn() {
    let fetcher = FixtureFetcher::new();
    for retailer in RetailerRegistry::builtin().iter() {
        for raw in ["", "0", "123456789", "97801346859911", "isbn9780134685991", "0000000000"] {
            assert!(
                lookup(retailer.as_ref(), raw, &Filters::default(), &fetcher).await.is_err(),
                "{} accepted {raw:?}",
                retailer.name()
            );
        }
    }
}

#[tokio::test]
async fn every_retailer_fails_cleanly_when_blocked() {
    // Every URL answers 404.
    let fetcher = FixtureFetcher::new();
    for retailer in RetailerRegistry::builtin().iter() {
        let isbn = retailer.self_test_isbn();
        let failure = lookup(retailer.as_ref(), &isbn, &Filters::default(), &fetcher)
            .await
            .expect_err(retailer.name());
        assert!(!failure.reason.is_empty());
    }
}

#[test]
fn registry_names_are_unique() {
    let registry = RetailerRegistry::builtin();
    let mut names = registry.names();
    names.sort_unstable();
    names.dedup();
    assert_eq!(names.len(), registry.len());
}

#[test]
fn self_test_isbns_parse() {
    for retailer in RetailerRegistry::builtin().iter() {
        let isbn = retailer.self_test_isbn();
        assert_eq!(Isbn::parse(isbn.as_str()).unwrap(), isbn);
    }
}

/// Live check against the real sites. Retailers may block or redesign, so
/// this is opt-in: `cargo test -- --ignored`.
#[tokio::test]
#[ignore = "requires network access"]
async fn self_test_isbns_resolve_live() {
    let client = AcceleratedClient::with_options(Duration::from_secs(30), bookmark::HostThrottle::disabled())
        .unwrap();
    for retailer in RetailerRegistry::builtin().iter() {
        let isbn = retailer.self_test_isbn();
        match lookup(retailer.as_ref(), &isbn, &Filters::default(), &client).await {
            Ok(book) => {
                assert!(book.price > 0.0);
                assert_eq!(book.isbn, isbn);
                assert!(retailer.offering().admits(book.medium), "{}", retailer.name());
            }
            Err(e) => eprintln!("{e}"),
        }
    }
}
