//! CLI argument definitions for stockflow.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `orders serve` | Run the Orders service against a Products base URL |
//! | `products serve` | Run the Products service with cached views |
//!
//! Bind addresses and the products URL also read `STOCKFLOW_*` variables.
//!
//! # Examples
//!
//! ```bash
//! stockflow products serve --seed products.json
//! stockflow orders serve --products-url http://127.0.0.1:5002 --max-retries 2
//! RUST_LOG=stockflow_core=debug stockflow orders serve --circuit-breaker-threshold 5
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use stockflow_core::{
    Backoff, CircuitBreakerConfig, ConcurrencyConfig, LocalCacheConfig, LocalEntryOptions,
    PipelineConfig, RateLimitConfig, RetryConfig, SharedEntryOptions, TierPolicy,
    VerificationMode, ViewThresholds,
};

/// Order placement with stock verification, and cached product views.
#[derive(Debug, Parser)]
#[command(name = "stockflow", author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Orders service.
    Orders {
        #[command(subcommand)]
        action: OrdersAction,
    },
    /// Products service.
    Products {
        #[command(subcommand)]
        action: ProductsAction,
    },
}

#[derive(Debug, Subcommand)]
pub enum OrdersAction {
    /// Serve `POST /api/orders` and `GET /api/orders/:id`.
    Serve(OrdersServeArgs),
}

#[derive(Debug, Subcommand)]
pub enum ProductsAction {
    /// Serve the catalogue, stock query, and cached views.
    Serve(ProductsServeArgs),
}

#[derive(Debug, Args)]
pub struct OrdersServeArgs {
    #[arg(long, env = "STOCKFLOW_ORDERS_BIND", default_value = "127.0.0.1:5001")]
    pub bind: SocketAddr,

    /// Base URL of the Products service.
    #[arg(long, env = "STOCKFLOW_PRODUCTS_URL", default_value = "http://127.0.0.1:5002")]
    pub products_url: String,

    /// How repeated product lines in one order are checked.
    #[arg(long, value_enum, default_value_t = VerificationArg::PerLine)]
    pub verification: VerificationArg,

    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum VerificationArg {
    /// Each line against the full stock count.
    PerLine,
    /// Quantities summed per product first.
    Summed,
}

impl From<VerificationArg> for VerificationMode {
    fn from(arg: VerificationArg) -> Self {
        match arg {
            VerificationArg::PerLine => Self::PerLine,
            VerificationArg::Summed => Self::Summed,
        }
    }
}

/// Resilience pipeline knobs for stock-service calls.
#[derive(Debug, Clone, Args)]
pub struct PipelineArgs {
    /// Per-attempt timeout.
    #[arg(long, default_value_t = 5_000)]
    pub attempt_timeout_ms: u64,

    /// Retries after the first attempt (0 disables retry).
    #[arg(long, default_value_t = 4)]
    pub max_retries: u32,

    #[arg(long, default_value_t = 2_000)]
    pub retry_base_delay_ms: u64,

    #[arg(long, default_value_t = 30_000)]
    pub retry_max_delay_ms: u64,

    #[arg(long, default_value_t = false)]
    pub no_jitter: bool,

    /// Simultaneous stock calls (0 disables the limiter).
    #[arg(long, default_value_t = 1)]
    pub concurrency_limit: usize,

    #[arg(long, default_value_t = 2)]
    pub concurrency_queue: usize,

    /// Stock calls per rate window (0 disables the limiter).
    #[arg(long, default_value_t = 2)]
    pub rate_limit: u32,

    #[arg(long, default_value_t = 60)]
    pub rate_window_secs: u64,

    #[arg(long, default_value_t = 10)]
    pub rate_queue: usize,

    /// Consecutive failures that open the circuit; omitted means no breaker.
    #[arg(long)]
    pub circuit_breaker_threshold: Option<u32>,

    #[arg(long, default_value_t = 30)]
    pub circuit_break_secs: u64,
}

impl PipelineArgs {
    pub fn to_config(&self) -> PipelineConfig {
        let retry = if self.max_retries == 0 {
            RetryConfig::disabled()
        } else {
            RetryConfig {
                max_retries: self.max_retries,
                backoff: Backoff::Exponential {
                    initial: Duration::from_millis(self.retry_base_delay_ms),
                    multiplier: 2.0,
                    cap: Duration::from_millis(self.retry_max_delay_ms),
                    jitter: !self.no_jitter,
                },
                ..RetryConfig::default()
            }
        };

        PipelineConfig {
            rate_limit: (self.rate_limit > 0).then(|| RateLimitConfig {
                permit_limit: self.rate_limit,
                window: Duration::from_secs(self.rate_window_secs),
                queue_limit: self.rate_queue,
            }),
            concurrency: (self.concurrency_limit > 0).then(|| ConcurrencyConfig {
                permit_limit: self.concurrency_limit,
                queue_limit: self.concurrency_queue,
            }),
            retry,
            circuit_breaker: self
                .circuit_breaker_threshold
                .map(|failure_threshold| CircuitBreakerConfig {
                    failure_threshold,
                    break_duration: Duration::from_secs(self.circuit_break_secs),
                }),
            attempt_timeout: Duration::from_millis(self.attempt_timeout_ms),
        }
    }
}

#[derive(Debug, Args)]
pub struct ProductsServeArgs {
    #[arg(long, env = "STOCKFLOW_PRODUCTS_BIND", default_value = "127.0.0.1:5002")]
    pub bind: SocketAddr,

    /// JSON array of products loaded at startup.
    #[arg(long, env = "STOCKFLOW_PRODUCTS_SEED")]
    pub seed: Option<PathBuf>,

    #[command(flatten)]
    pub cache: CacheArgs,

    /// Highest stock still listed as limited.
    #[arg(long, default_value_t = 30)]
    pub limited_stock_max: u32,

    /// Stock above this is listed as overstocked.
    #[arg(long, default_value_t = 100)]
    pub overstocked_above: u32,
}

impl ProductsServeArgs {
    pub fn thresholds(&self) -> ViewThresholds {
        ViewThresholds {
            limited_stock_max: self.limited_stock_max,
            overstocked_above: self.overstocked_above,
        }
    }
}

/// Tier expiry and capacity.
#[derive(Debug, Clone, Args)]
pub struct CacheArgs {
    #[arg(long, default_value_t = 120)]
    pub local_sliding_secs: u64,

    /// Local capacity in product entries; unbounded when omitted.
    #[arg(long)]
    pub local_size_limit: Option<u64>,

    #[arg(long, default_value_t = 5)]
    pub shared_sliding_secs: u64,

    #[arg(long, default_value_t = 20)]
    pub shared_absolute_secs: u64,
}

impl CacheArgs {
    pub fn local_config(&self) -> LocalCacheConfig {
        LocalCacheConfig {
            size_limit: self.local_size_limit,
        }
    }

    pub fn tier_policy(&self) -> TierPolicy {
        TierPolicy {
            local: LocalEntryOptions {
                sliding: Some(Duration::from_secs(self.local_sliding_secs)),
                absolute: None,
            },
            shared: SharedEntryOptions {
                sliding: Some(Duration::from_secs(self.shared_sliding_secs)),
                absolute: Some(Duration::from_secs(self.shared_absolute_secs)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orders_args(extra: &[&str]) -> OrdersServeArgs {
        let mut argv = vec!["stockflow", "orders", "serve"];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).expect("parses").command {
            Command::Orders {
                action: OrdersAction::Serve(args),
            } => args,
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn pipeline_defaults_match_library_defaults() {
        let args = orders_args(&[]);
        let config = args.pipeline.to_config();

        assert_eq!(config, PipelineConfig::default());
        assert_eq!(args.verification, VerificationArg::PerLine);
    }

    #[test]
    fn zero_limits_disable_layers() {
        let config = orders_args(&[
            "--max-retries",
            "0",
            "--concurrency-limit",
            "0",
            "--rate-limit",
            "0",
        ])
        .pipeline
        .to_config();

        assert_eq!(config.rate_limit, None);
        assert_eq!(config.concurrency, None);
        assert_eq!(config.retry.max_attempts(), 1);
    }

    #[test]
    fn circuit_breaker_is_opt_in() {
        let config = orders_args(&["--circuit-breaker-threshold", "3"])
            .pipeline
            .to_config();
        assert_eq!(
            config.circuit_breaker,
            Some(CircuitBreakerConfig {
                failure_threshold: 3,
                break_duration: Duration::from_secs(30),
            })
        );
    }

    #[test]
    fn cache_defaults_match_tier_policy_defaults() {
        let cli = Cli::try_parse_from(["stockflow", "products", "serve"]).expect("parses");
        let Command::Products {
            action: ProductsAction::Serve(args),
        } = cli.command
        else {
            panic!("expected products serve");
        };

        assert_eq!(args.cache.tier_policy(), TierPolicy::default());
        assert_eq!(args.cache.local_config(), LocalCacheConfig::default());
        assert_eq!(args.thresholds(), ViewThresholds::default());
    }

    #[test]
    fn overstocked_flag_sets_the_view_threshold() {
        let cli = Cli::try_parse_from([
            "stockflow",
            "products",
            "serve",
            "--overstocked-above",
            "250",
        ])
        .expect("parses");
        let Command::Products {
            action: ProductsAction::Serve(args),
        } = cli.command
        else {
            panic!("expected products serve");
        };

        assert_eq!(args.thresholds().overstocked_above, 250);
        assert_eq!(args.thresholds().limited_stock_max, 30);
    }

    #[test]
    fn subcommand_is_required() {
        assert!(Cli::try_parse_from(["stockflow"]).is_err());
    }
}
