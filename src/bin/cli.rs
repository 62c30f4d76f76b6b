//! FeedStore CLI Client
//!
//! Command-line interface for interacting with a FeedStore server.

use alloy_primitives::Address;
use clap::{Parser, Subcommand};
use feedstore::network::Client;
use feedstore::protocol::{decode_round, AdminCommand, ReadQuery, SlotRange, WriteBatch};

/// FeedStore CLI
#[derive(Parser, Debug)]
#[command(name = "feedstore-cli")]
#[command(about = "CLI for the FeedStore oracle feed store")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:7411")]
    server: String,

    /// Identity to send requests as (hex address)
    #[arg(short, long, default_value = "0x0000000000000000000000000000000000000000")]
    caller: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write one feed value under a new block number
    Write {
        #[arg(long)]
        block: u64,
        #[arg(long, default_value = "0")]
        stride: u8,
        #[arg(long)]
        id: u128,
        #[arg(long)]
        round: u16,
        /// Value as hex
        data: String,
    },

    /// Latest round of a feed
    LatestRound {
        #[arg(long, default_value = "0")]
        stride: u8,
        #[arg(long)]
        id: u128,
    },

    /// Latest value of a single-slot feed
    LatestSingle {
        #[arg(long)]
        id: u128,
    },

    /// Latest value and round of a single-slot feed
    LatestSingleAndRound {
        #[arg(long)]
        id: u128,
    },

    /// Latest value of a feed
    Latest {
        #[arg(long, default_value = "0")]
        stride: u8,
        #[arg(long)]
        id: u128,
        #[arg(long, default_value = "0")]
        offset: u32,
        /// Slots to read, 0 for the rest of the allocation
        #[arg(long, default_value = "0")]
        count: u32,
    },

    /// Latest value and round of a feed
    LatestAndRound {
        #[arg(long, default_value = "0")]
        stride: u8,
        #[arg(long)]
        id: u128,
        #[arg(long, default_value = "0")]
        offset: u32,
        #[arg(long, default_value = "0")]
        count: u32,
    },

    /// Value of a feed at a given round
    AtRound {
        #[arg(long, default_value = "0")]
        stride: u8,
        #[arg(long)]
        id: u128,
        #[arg(long)]
        round: u16,
        #[arg(long, default_value = "0")]
        offset: u32,
        #[arg(long, default_value = "0")]
        count: u32,
    },

    /// Point the proxy at another implementation (admin only)
    Upgrade {
        /// Implementation address
        address: String,
    },

    /// Hand the proxy admin role to another identity (admin only)
    SetAdmin {
        /// New admin address
        address: String,
    },
}

fn main() {
    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let caller: Address = args.caller.parse()?;
    let mut client = Client::connect(&args.server, caller)?;

    match args.command {
        Commands::Write {
            block,
            stride,
            id,
            round,
            data,
        } => {
            let data = hex::decode(data.trim_start_matches("0x"))?;
            client.write(WriteBatch::new(block).feed(id, stride, round, data))?;
            println!("OK");
        }
        Commands::LatestRound { stride, id } => {
            println!("{}", client.latest_round(stride, id)?);
        }
        Commands::LatestSingle { id } => {
            print_hex(&client.read(ReadQuery::LatestSingleFeed { id })?);
        }
        Commands::LatestSingleAndRound { id } => {
            print_with_round(&client.read(ReadQuery::LatestSingleFeedAndRound { id })?)?;
        }
        Commands::Latest {
            stride,
            id,
            offset,
            count,
        } => {
            let range = SlotRange::new(offset, count);
            print_hex(&client.read(ReadQuery::LatestFeed { stride, id, range })?);
        }
        Commands::LatestAndRound {
            stride,
            id,
            offset,
            count,
        } => {
            let range = SlotRange::new(offset, count);
            print_with_round(&client.read(ReadQuery::LatestFeedAndRound { stride, id, range })?)?;
        }
        Commands::AtRound {
            stride,
            id,
            round,
            offset,
            count,
        } => {
            let range = SlotRange::new(offset, count);
            print_hex(&client.read(ReadQuery::FeedAtRound {
                stride,
                id,
                round,
                range,
            })?);
        }
        Commands::Upgrade { address } => {
            client.admin(AdminCommand::UpgradeTo(address.parse()?))?;
            println!("OK");
        }
        Commands::SetAdmin { address } => {
            client.admin(AdminCommand::ChangeAdmin(address.parse()?))?;
            println!("OK");
        }
    }

    Ok(())
}

fn print_hex(bytes: &[u8]) {
    println!("0x{}", hex::encode(bytes));
}

fn print_with_round(bytes: &[u8]) -> Result<(), Box<dyn std::error::Error>> {
    let round = decode_round(bytes)?;
    println!("round {}", round);
    print_hex(&bytes[32..]);
    Ok(())
}
