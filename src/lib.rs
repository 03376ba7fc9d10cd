//! mathnet_loader
//!
//! A lightweight Rust library for browsing a static dataset of mathematics
//! competition problems organized by country and year. Pairs with the
//! `mathnet` CLI.
//!
//! ### Features
//! - Load the country index once, with an embedded fallback list
//! - Load each country lazily; concurrent requests share one fetch
//! - Degrade to embedded sample data (or an empty dataset) on any failure
//! - Read-only queries: years, problems, counts, aggregate stats
//!
//! ### Example
//! ```no_run
//! use mathnet_loader::{DataLoader, fetch::HttpSource};
//!
//! let loader = DataLoader::with_defaults(HttpSource::new("https://example.org/mathnet/")?);
//! for country in loader.load_index() {
//!     loader.ensure_loaded(&country);
//!     println!("{}: {:?}", country, loader.years(&country));
//! }
//! println!("{:?}", loader.data_stats());
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod config;
pub mod error;
pub mod fetch;
pub mod index;
pub mod loader;
pub mod models;
pub mod sample;
pub mod slug;
pub mod stats;

pub use config::LoaderConfig;
pub use error::FetchError;
pub use loader::DataLoader;
pub use models::{CountryDataset, DataStats, IndexOutcome, LoadOutcome, Problem};
pub use slug::slugify;
