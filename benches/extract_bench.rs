//! Benchmarks for price scanning and listing extraction.
//!
//! Measures the page-wide currency scan on a large page and one full
//! AbeBooks ladder served from a fixture.
//!
//! Run with: `cargo bench --bench extract_bench`

use std::fmt::Write as _;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use scraper::Html;

use bookmark::retailer::abebooks::AbeBooks;
use bookmark::retailer::ladder::{page_wide_scan, Scope};
use bookmark::{lookup, price, Filters, FixtureFetcher, Isbn};

const ISBN: &str = "9798991511100";

/// A results page with `n` listings, the target ISBN near the end.
fn listing_page(n: usize) -> String {
    let mut html = String::from("<html><body><ul>");
    for i in 0..n {
        let _ = write!(
            html,
            r#"<li data-test-id="listing-item">
                 <a data-test-id="listing-title-link" href="/servlet/BookDetailsPL?bi={i}">
                   <span data-test-id="listing-title">Quantum Physics for Beginners, printing {i}</span></a>
                 <span data-test-id="listing-book-condition">Used - Good</span>
                 <p data-test-id="item-price">US$ {}.{:02}</p>
                 <p>Shipping: US$ 3.99 within U.S.A.</p>
               </li>"#,
            5 + i % 40,
            i % 100
        );
    }
    let _ = write!(html, "<p>ISBN 13: {ISBN}</p><p>US$ 12.34</p></ul></body></html>");
    html
}

fn bench_price_scan(c: &mut Criterion) {
    let page = listing_page(200);
    let text = Html::parse_document(&page).root_element().text().collect::<String>();

    let mut group = c.benchmark_group("price_scan");

    group.bench_function("currency_amounts", |b| {
        b.iter(|| black_box(price::currency_amounts(black_box(&text))));
    });

    group.bench_function("amount_near_isbn", |b| {
        b.iter(|| black_box(price::amount_near(black_box(&text), ISBN, 400)));
    });

    let document = Html::parse_document(&page);
    let isbn = Isbn::parse(ISBN).unwrap();
    group.bench_function("page_wide_scan", |b| {
        let scope = Scope {
            isbn: &isbn,
            page_url: "https://www.abebooks.com/servlet/SearchResults",
            base_url: "https://www.abebooks.com",
        };
        b.iter(|| black_box(page_wide_scan(&document, &scope)));
    });

    group.finish();
}

fn bench_listing_ladder(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let fetcher = FixtureFetcher::new().with_page(
        format!("https://www.abebooks.com/servlet/SearchResults?kn={ISBN}"),
        listing_page(50),
    );

    c.bench_function("abebooks_lookup_50_listings", |b| {
        b.iter(|| {
            let book = runtime
                .block_on(lookup(&AbeBooks, ISBN, &Filters::default(), &fetcher))
                .unwrap();
            black_box(book)
        });
    });
}

criterion_group!(benches, bench_price_scan, bench_listing_ladder);
criterion_main!(benches);
