use std::{sync::Arc, time::Duration};

use alloy_primitives::Address;
use anyhow::{anyhow, bail};
use clap::{Args, Parser, Subcommand};
use swapline_common::{
    aggregate::{IndexWindow, IndexedReader, ViewModelAggregator},
    errors::SwapError,
    models::{token::TokenRef, Currency},
    quote::QuoteEngine,
    routing::PathResolver,
    sequencer::{SequencerConfig, SwapRequest, TransactionSequencer},
    slippage::SlippagePolicy,
    traits::{ChainQuery, StaticAccount},
    units::{format_amount_for_display, DEFAULT_DISPLAY_PRECISION},
};
use swapline_ethereum::{
    dry_run::DryRun,
    pairs::{FactoryPairs, PairListing},
    rpc::{config::RPCRetryConfig, ContractAddresses, HttpChainClient},
};
use tracing::{debug, info};

#[derive(Parser, PartialEq, Debug)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(flatten)]
    global_args: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
struct GlobalArgs {
    /// Ethereum node client rpc url
    #[clap(long, env = "SWAPLINE_RPC_URL")]
    rpc_url: String,

    /// Uniswap-V2 router. Defaults to the mainnet deployment.
    #[clap(long, env = "SWAPLINE_ROUTER", default_value = "0x7a250d5630B4cF539739dF2C5dAcb4c659F2488D")]
    router: Address,

    /// Uniswap-V2 factory. Defaults to the mainnet deployment.
    #[clap(long, env = "SWAPLINE_FACTORY", default_value = "0x5C69bEe701ef814a2B6a3EDD4B1652CB9cc5aA6f")]
    factory: Address,

    /// Wrapped native token substituted for ETH in swap paths.
    #[clap(
        long,
        env = "SWAPLINE_WRAPPED_NATIVE",
        default_value = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"
    )]
    wrapped_native: Address,

    /// Slippage tolerance in basis points.
    #[clap(long, default_value = "50")]
    slippage_bps: u32,

    /// Minutes until a submitted transaction expires.
    #[clap(long, default_value = "20")]
    deadline_minutes: u64,

    /// Retries of a failed rpc request before giving up.
    #[clap(long, default_value = "3")]
    max_retries: usize,

    /// Enable verbose logging.
    #[clap(long)]
    verbose: bool,
}

impl GlobalArgs {
    fn policy(&self) -> Result<SlippagePolicy, SwapError> {
        let buffer = self
            .deadline_minutes
            .checked_mul(60)
            .ok_or(SwapError::InvalidDeadlineBuffer(self.deadline_minutes))?;
        SlippagePolicy::new(self.slippage_bps, Duration::from_secs(buffer))
    }

    fn client(&self) -> anyhow::Result<HttpChainClient> {
        let retry = RPCRetryConfig { max_retries: self.max_retries, ..RPCRetryConfig::default() };
        Ok(HttpChainClient::new(
            &self.rpc_url,
            ContractAddresses { factory: self.factory, router: self.router },
            retry,
        )?)
    }
}

#[derive(Subcommand, Clone, PartialEq, Debug)]
enum Command {
    /// Quote the output of selling an exact input amount.
    Quote(TradeArgs),
    /// Print the unsigned transactions of a swap, including an approval if the allowance is short.
    Swap(SwapArgs),
    /// Show the pair of two tokens and its reserves.
    Pair(PairArgs),
    /// List the pairs created by the factory, newest first.
    Pairs(PairsArgs),
}

#[derive(Args, Clone, PartialEq, Debug)]
struct TradeArgs {
    /// Currency sold, either `eth` or an ERC-20 address
    #[clap(long)]
    from: Currency,
    /// Currency bought, either `eth` or an ERC-20 address
    #[clap(long)]
    to: Currency,
    /// Amount sold as a decimal string, e.g. 2.5
    #[clap(long)]
    amount: String,
}

#[derive(Args, Clone, PartialEq, Debug)]
struct SwapArgs {
    #[command(flatten)]
    trade: TradeArgs,
    /// Account paying the input and receiving the output.
    #[clap(long)]
    account: Address,
}

#[derive(Args, Clone, PartialEq, Debug)]
struct PairArgs {
    #[clap(long)]
    token_a: Currency,
    #[clap(long)]
    token_b: Currency,
}

#[derive(Args, Clone, PartialEq, Debug)]
struct PairsArgs {
    #[clap(long, default_value = "0")]
    page: u64,
    #[clap(long, default_value = "20")]
    size: u64,
}

async fn token_ref(client: &HttpChainClient, currency: Currency) -> anyhow::Result<TokenRef> {
    match currency {
        Currency::Native => Ok(TokenRef::native("ETH")),
        Currency::Token(address) => Ok(TokenRef::erc20(address, client.token_metadata(address).await?)),
    }
}

fn display(amount: &swapline_common::Amount, token: &TokenRef) -> String {
    format!(
        "{} {}",
        format_amount_for_display(amount, token.decimals, DEFAULT_DISPLAY_PRECISION),
        token.symbol
    )
}

async fn quote(global: &GlobalArgs, client: Arc<HttpChainClient>, args: TradeArgs) -> anyhow::Result<()> {
    let policy = global.policy()?;
    let input = token_ref(&client, args.from).await?;
    let output = token_ref(&client, args.to).await?;
    let engine = QuoteEngine::new(client, PathResolver::new(global.wrapped_native));

    let quote = engine
        .try_quote(&input, &output, &args.amount)
        .await?;
    println!("{} -> {}", display(&quote.input_amount, &input), display(&quote.output_amount, &output));
    println!(
        "Minimum received: {}",
        display(&policy.min_output(&quote.output_amount).bounded_amount, &output)
    );
    if let Some(route) = &quote.route {
        match engine
            .price_impact_bps(route, &quote.input_amount)
            .await
        {
            Ok(bps) => println!("Price impact: {}.{:02}%", bps / 100, bps % 100),
            Err(err) => debug!(%err, "Price impact unavailable"),
        }
    }
    Ok(())
}

/// Runs the swap through the sequencer without broadcasting and prints the transactions it
/// would have submitted.
async fn swap(global: &GlobalArgs, client: Arc<HttpChainClient>, args: SwapArgs) -> anyhow::Result<()> {
    let policy = global.policy()?;
    let input = token_ref(&client, args.trade.from).await?;
    let output = token_ref(&client, args.trade.to).await?;
    let engine = QuoteEngine::new(client.clone(), PathResolver::new(global.wrapped_native));
    let quote = engine
        .try_quote(&input, &output, &args.trade.amount)
        .await?;

    let dry_run = Arc::new(DryRun::new(client));
    let sequencer = TransactionSequencer::new(
        dry_run.clone(),
        dry_run.clone(),
        Arc::new(StaticAccount(args.account)),
        SequencerConfig { router: global.router, wrapped_native: global.wrapped_native, policy },
    );
    let report = sequencer
        .execute_swap(SwapRequest {
            input: Some(input),
            output: Some(output),
            amount: args.trade.amount,
            quote: Some(quote),
        })
        .await?;
    info!(approvals = report.approvals.len(), kind = %report.intent.kind(), "Prepared swap");

    let transactions = dry_run
        .transactions(global.router)
        .await?;
    println!("{}", serde_json::to_string_pretty(&transactions)?);
    Ok(())
}

async fn pair(global: &GlobalArgs, client: Arc<HttpChainClient>, args: PairArgs) -> anyhow::Result<()> {
    let token_a = args.token_a.resolve(global.wrapped_native);
    let token_b = args.token_b.resolve(global.wrapped_native);
    if token_a == token_b {
        bail!(SwapError::IdenticalTokens(token_a.to_string()));
    }

    let Some(pair) = client
        .get_pair_address(token_a, token_b)
        .await?
    else {
        println!("No pair for {token_a} and {token_b}");
        return Ok(());
    };
    let (token0, token1) = if token_a < token_b { (token_a, token_b) } else { (token_b, token_a) };
    let (reserve0, reserve1) = client.get_reserves(pair).await?;
    let token0 = token_ref(&client, Currency::Token(token0)).await?;
    let token1 = token_ref(&client, Currency::Token(token1)).await?;

    println!("Pair: {pair}");
    println!("Reserves: {} / {}", display(&reserve0, &token0), display(&reserve1, &token1));
    Ok(())
}

async fn pairs(client: Arc<HttpChainClient>, args: PairsArgs) -> anyhow::Result<()> {
    let reader = FactoryPairs::new(client);
    let total = reader.count().await?;
    let aggregator = ViewModelAggregator::<PairListing>::new()
        .with_source(Arc::new(reader.into_source("factory", IndexWindow::page(args.page, args.size))));
    aggregator.refresh_all().await;
    if let Some((source, error)) = aggregator.errors().await.into_iter().next() {
        return Err(anyhow!("Failed to load {source}: {error}"));
    }

    let listings = aggregator.items().await;
    for listing in &listings {
        println!("#{} {}", listing.index, listing.pair);
    }
    println!("Page {}: {} of {} pairs", args.page, listings.len(), total);
    Ok(())
}

#[tokio::main]
pub async fn main() -> anyhow::Result<()> {
    let cli: Cli = Cli::parse();

    let log_level = if cli.global_args.verbose { "debug" } else { "info" };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow!("Failed to set up logging subscriber: {e}"))?;

    let client = Arc::new(cli.global_args.client()?);
    match cli.command {
        Command::Quote(args) => quote(&cli.global_args, client, args).await?,
        Command::Swap(args) => swap(&cli.global_args, client, args).await?,
        Command::Pair(args) => pair(&cli.global_args, client, args).await?,
        Command::Pairs(args) => pairs(client, args).await?,
    };
    Ok(())
}

#[cfg(test)]
mod tests {
    use alloy_primitives::address;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[test]
    fn test_cli_args() {
        let cli = Cli::try_parse_from([
            "swapline",
            "--rpc-url",
            "http://localhost:8545",
            "--slippage-bps",
            "100",
            "quote",
            "--from",
            "ETH",
            "--to",
            "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48",
            "--amount",
            "2.5",
        ])
        .unwrap();

        assert_eq!(cli.global_args.rpc_url, "http://localhost:8545");
        assert_eq!(cli.global_args.router, address!("7a250d5630B4cF539739dF2C5dAcb4c659F2488D"));
        assert_eq!(cli.global_args.slippage_bps, 100);
        assert_eq!(
            cli.command,
            Command::Quote(TradeArgs {
                from: Currency::Native,
                to: Currency::Token(address!("a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48")),
                amount: "2.5".to_string(),
            })
        );
        assert_eq!(cli.global_args.policy().unwrap().tolerance_bps(), 100);
    }

    #[test]
    fn test_invalid_currency() {
        let res = Cli::try_parse_from([
            "swapline",
            "--rpc-url",
            "http://localhost:8545",
            "pair",
            "--token-a",
            "USDC",
            "--token-b",
            "eth",
        ]);

        assert!(res.is_err());
    }

    #[test]
    fn test_native_sentinel_address_is_native() {
        let cli = Cli::try_parse_from([
            "swapline",
            "--rpc-url",
            "http://localhost:8545",
            "pair",
            "--token-a",
            "0xEeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE",
            "--token-b",
            "native",
        ])
        .unwrap();

        assert_eq!(
            cli.command,
            Command::Pair(PairArgs { token_a: Currency::Native, token_b: Currency::Native })
        );
    }

    #[test]
    fn test_out_of_range_slippage() {
        let cli = Cli::try_parse_from([
            "swapline",
            "--rpc-url",
            "http://localhost:8545",
            "--slippage-bps",
            "10001",
            "pairs",
        ])
        .unwrap();

        assert!(matches!(cli.global_args.policy(), Err(SwapError::InvalidToleranceRange(_))));
    }

    #[rstest]
    #[case::zero("0")]
    #[case::overflowing_seconds("18446744073709551615")]
    fn test_invalid_deadline(#[case] minutes: &str) {
        let cli = Cli::try_parse_from([
            "swapline",
            "--rpc-url",
            "http://localhost:8545",
            "--deadline-minutes",
            minutes,
            "pairs",
        ])
        .unwrap();

        assert!(matches!(cli.global_args.policy(), Err(SwapError::InvalidDeadlineBuffer(_))));
    }

    #[test]
    fn test_swap_and_pairs_args() {
        let cli = Cli::try_parse_from([
            "swapline",
            "--rpc-url",
            "http://localhost:8545",
            "swap",
            "--from",
            "0x6B175474E89094C44Da98b954EedeAC495271d0F",
            "--to",
            "eth",
            "--amount",
            "100",
            "--account",
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266",
        ])
        .unwrap();
        assert_eq!(
            cli.command,
            Command::Swap(SwapArgs {
                trade: TradeArgs {
                    from: Currency::Token(address!("6B175474E89094C44Da98b954EedeAC495271d0F")),
                    to: Currency::Native,
                    amount: "100".to_string(),
                },
                account: address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266"),
            })
        );

        let cli = Cli::try_parse_from(["swapline", "--rpc-url", "http://localhost:8545", "pairs", "--page", "2"])
            .unwrap();
        assert_eq!(cli.command, Command::Pairs(PairsArgs { page: 2, size: 20 }));
    }
}
