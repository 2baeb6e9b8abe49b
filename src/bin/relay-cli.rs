use alloy::eips::BlockNumberOrTag;
use alloy::primitives::{Address, B256, U256};
use clap::{Parser, Subcommand};
use futures_util::StreamExt;
use std::path::PathBuf;

use order_relay::chain::abi::format_value;
use order_relay::chain::{
    parse_block_tag, AbiFamily, AccountStore, BatchTransactionRecipientReq, BatchTransactionReq, ChainAccessor,
};
use order_relay::config::{load_config, RelayConfig};

#[derive(Parser)]
#[command(name = "relay-cli")]
#[command(about = "Chain queries through the order relay's accessor", long_about = None)]
struct Cli {
    /// Relay configuration file (defaults apply when omitted).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured JSON-RPC endpoint.
    #[arg(short, long)]
    rpc_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Latest block number
    BlockNumber,
    /// ERC-20 balance of an owner
    Balance {
        token: Address,
        owner: Address,
        #[arg(long, default_value = "latest", value_parser = parse_block_tag)]
        block: BlockNumberOrTag,
    },
    /// ERC-20 allowance granted by an owner to a spender
    Allowance {
        token: Address,
        owner: Address,
        spender: Address,
        #[arg(long, default_value = "latest", value_parser = parse_block_tag)]
        block: BlockNumberOrTag,
    },
    /// Amount of an order already cancelled or filled
    CancelledOrFilled {
        protocol: Address,
        order_hash: B256,
        #[arg(long, default_value = "latest", value_parser = parse_block_tag)]
        block: BlockNumberOrTag,
    },
    /// Cutoff timestamp of an owner
    Cutoff {
        protocol: Address,
        owner: Address,
        #[arg(long, default_value = "latest", value_parser = parse_block_tag)]
        block: BlockNumberOrTag,
    },
    /// Token address registered under a symbol
    TokenBySymbol { registry: Address, symbol: String },
    /// Whether an address is authorized on the transfer delegate
    Authorized { delegate: Address, address: Address },
    /// Protocol address table
    Protocols,
    /// Call any read-only contract method
    Call {
        #[arg(value_enum)]
        abi: AbiFamily,
        address: Address,
        method: String,
        args: Vec<String>,
        #[arg(long, default_value = "latest", value_parser = parse_block_tag)]
        block: BlockNumberOrTag,
    },
    /// Sign and broadcast a contract method call (keys from RELAY_ACCOUNT_KEYS)
    Send {
        #[arg(value_enum)]
        abi: AbiFamily,
        address: Address,
        method: String,
        args: Vec<String>,
        #[arg(long)]
        from: Address,
        #[arg(long, default_value = "0")]
        value: U256,
        #[arg(long)]
        gas_limit: Option<u64>,
        /// Gas price in wei
        #[arg(long)]
        gas_price: Option<u128>,
    },
    /// Scan blocks [start, end)
    Scan {
        start: u64,
        end: u64,
        #[arg(long)]
        full: bool,
        /// Blocks per round trip (0 = configured default)
        #[arg(long, default_value = "0")]
        batch_size: usize,
    },
    /// Fetch transactions by hash
    Transactions {
        hashes: Vec<B256>,
        /// Hashes per round trip (0 = configured default)
        #[arg(long, default_value = "0")]
        batch_size: usize,
    },
    /// Fetch receipts by transaction hash
    Receipts {
        hashes: Vec<B256>,
        /// Hashes per round trip (0 = configured default)
        #[arg(long, default_value = "0")]
        batch_size: usize,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => RelayConfig::default(),
    };
    if let Some(url) = cli.rpc_url {
        config.chain.rpc_url = url;
    }

    let accounts = AccountStore::from_env()?;
    let accessor = ChainAccessor::new(&config, accounts)?;
    let tx_batch_size = |n: usize| if n == 0 { config.scan.tx_batch_size } else { n };

    match cli.command {
        Commands::BlockNumber => println!("{}", accessor.block_number().await?),
        Commands::Balance { token, owner, block } => {
            println!("{}", accessor.erc20_balance(token, owner, block).await?);
        }
        Commands::Allowance {
            token,
            owner,
            spender,
            block,
        } => {
            println!("{}", accessor.erc20_allowance(token, owner, spender, block).await?);
        }
        Commands::CancelledOrFilled {
            protocol,
            order_hash,
            block,
        } => {
            println!("{}", accessor.get_cancelled_or_filled(protocol, order_hash, block).await?);
        }
        Commands::Cutoff { protocol, owner, block } => {
            println!("{}", accessor.get_cutoff(protocol, owner, block).await?);
        }
        Commands::TokenBySymbol { registry, symbol } => {
            println!("{}", accessor.token_address_by_symbol(registry, &symbol).await?);
        }
        Commands::Authorized { delegate, address } => {
            println!("{}", accessor.is_address_authorized(delegate, address).await?);
        }
        Commands::Protocols => {
            let mut accessor = accessor;
            accessor.complete_protocol_addresses(&config.protocols).await?;
            for p in accessor.protocols().iter() {
                println!(
                    "{} impl={} registry={} delegate={} lrc={}",
                    p.version, p.implementation, p.token_registry, p.delegate, p.lrc_token
                );
            }
        }
        Commands::Call {
            abi,
            address,
            method,
            args,
            block,
        } => {
            let caller = accessor.contract_call_method(accessor.abis().get(abi), address);
            let args = caller.coerce_args(&method, &args)?;
            for value in caller.call(&method, block, &args).await? {
                println!("{}", format_value(&value));
            }
        }
        Commands::Send {
            abi,
            address,
            method,
            args,
            from,
            value,
            gas_limit,
            gas_price,
        } => {
            let sender = accessor.contract_send_transaction_method(accessor.abis().get(abi), address);
            let args = sender.coerce_args(&method, &args)?;
            let hash = sender
                .send(from, &method, gas_limit, gas_price, value, &args)
                .await?;
            println!("{}", hash);
        }
        Commands::Scan {
            start,
            end,
            full,
            batch_size,
        } => {
            let mut blocks = Box::pin(accessor.block_iterator(start, end, full, batch_size).into_stream());
            while let Some(block) = blocks.next().await {
                let block = block?;
                println!(
                    "{} {} ts={} txs={}",
                    block.number,
                    block.hash,
                    block.timestamp,
                    block.transactions.len()
                );
            }
        }
        Commands::Transactions { hashes, batch_size } => {
            let mut reqs = BatchTransactionReq::from_hashes(hashes);
            accessor.batch_transactions(tx_batch_size(batch_size), &mut reqs).await?;
            for req in &reqs {
                match (req.payload(), req.error()) {
                    (Some(tx), _) => println!("{}", serde_json::to_string(tx)?),
                    (_, Some(e)) => eprintln!("{}: {}", req.tx_hash, e),
                    _ => eprintln!("{}: no result", req.tx_hash),
                }
            }
        }
        Commands::Receipts { hashes, batch_size } => {
            let mut reqs = BatchTransactionRecipientReq::from_hashes(hashes);
            accessor
                .batch_transaction_receipts(tx_batch_size(batch_size), &mut reqs)
                .await?;
            for req in &reqs {
                match (req.payload(), req.error()) {
                    (Some(receipt), _) => println!("{}", serde_json::to_string(receipt)?),
                    (_, Some(e)) => eprintln!("{}: {}", req.tx_hash, e),
                    _ => eprintln!("{}: no result", req.tx_hash),
                }
            }
        }
    }

    Ok(())
}
