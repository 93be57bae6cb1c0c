use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "unfluffed",
    version,
    about = "Browse unfluffed kits and search products with affiliate links"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Base URL of the unfluffed backend (default: http://localhost:8000)
    #[arg(long, global = true)]
    pub backend_url: Option<String>,

    /// Store country: us, uk, ca
    #[arg(long, global = true)]
    pub country: Option<String>,

    /// Bypass the local cache and fetch fresh data
    #[arg(long, global = true)]
    pub no_cache: bool,

    /// Verbose logging to stderr
    #[arg(long, global = true)]
    pub debug: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Search for products
    Search {
        /// Search term (e.g., "desk lamp")
        query: String,

        /// Use the advanced search endpoint (implied by any filter flag)
        #[arg(long)]
        advanced: bool,

        /// Minimum price
        #[arg(long)]
        min_price: Option<String>,

        /// Maximum price
        #[arg(long)]
        max_price: Option<String>,

        /// Minimum star rating, 0 to 5
        #[arg(long)]
        min_rating: Option<String>,

        /// Category identifier (see `categories`)
        #[arg(long)]
        category: Option<String>,

        /// Sort order: relevance, price_low, price_high, rating, review_count
        #[arg(long)]
        sort: Option<String>,

        /// Max number of results to print (default: 10)
        #[arg(long, default_value = "10")]
        limit: usize,
    },

    /// Show search suggestions for partial text
    Suggest {
        text: String,
    },

    /// List product categories
    Categories,

    /// List the curated, tested kits
    Kits,

    /// Poll a product's live price
    Watch {
        /// Amazon ASIN, e.g. B07PXGQC1Q
        asin: String,

        /// Seconds between refreshes (default from config: 300)
        #[arg(long)]
        interval_secs: Option<u64>,

        /// Stop after this many refreshes
        #[arg(long)]
        count: Option<u64>,
    },

    /// Interactive search session (type `:help` for commands)
    Interactive,
}

impl Commands {
    /// Filter flags given to `search`, as (field, value) pairs.
    pub fn search_filters(&self) -> Vec<(&'static str, &str)> {
        match self {
            Commands::Search {
                min_price,
                max_price,
                min_rating,
                category,
                sort,
                ..
            } => [
                ("min_price", min_price),
                ("max_price", max_price),
                ("min_rating", min_rating),
                ("category", category),
                ("sort_by", sort),
            ]
            .into_iter()
            .filter_map(|(name, value)| value.as_deref().map(|v| (name, v)))
            .collect(),
            _ => Vec::new(),
        }
    }
}
