//! `Bookmark` - Cheapest-copy book search across retailers
//!
//! # Features
//!
//! - **Aggregation**: Every retailer runs concurrently; the cheapest valid offer wins
//! - **Strategy ladders**: Each retailer tries several parsing strategies in order
//! - **Fault containment**: Failures, timeouts and panics in one retailer never stop the rest
//! - **Declarative retailers**: Extra retailers from `retailers.toml`, no code needed
//! - **Browser Fingerprinting**: Realistic Chrome/Firefox/Safari profiles per request
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use bookmark::{AcceleratedClient, Coordinator, Filters, RetailerRegistry};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let coordinator = Coordinator::new(
//!         Arc::new(RetailerRegistry::builtin()),
//!         Arc::new(AcceleratedClient::new()?),
//!     );
//!     match coordinator.find_cheapest("9780134685991", &Filters::default()).await? {
//!         Some(book) => println!("{} at ${:.2} from {}", book.title, book.price, book.retailer),
//!         None => println!("No offer found"),
//!     }
//!     Ok(())
//! }
//! ```

pub mod book;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod fingerprint;
pub mod http_client;
pub mod metadata;
pub mod price;
pub mod retailer;
pub mod service;
pub mod throttle;

pub use book::{Book, Condition, Filters, Isbn, Medium};
pub use config::Config;
pub use coordinator::{Coordinator, Outcome};
pub use error::{ConfigError, ExtractionFailure, FetchError, IsbnError};
pub use fingerprint::{chrome_profile, firefox_profile, random_profile, safari_profile, BrowserProfile};
pub use http_client::{AcceleratedClient, Fetcher, FixtureFetcher};
pub use metadata::{GoogleBooks, MetadataResolver, Volume};
pub use retailer::{lookup, Offering, Retailer, RetailerRegistry};
pub use service::{BookSearchService, TitleMatch};
pub use throttle::HostThrottle;

/// Version of bookmark
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
