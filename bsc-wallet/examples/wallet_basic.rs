//! Derive a wallet from `BSC_WALLET_*` variables and print its state.
//!
//! ```bash
//! BSC_WALLET_MNEMONIC="abandon ... about" BSC_WALLET_NETWORK=testnet-1-s1 \
//!     cargo run --example wallet_basic
//! ```

#![allow(clippy::print_stdout)]

use bsc_wallet::WalletBuilder;
use bsc_wallet::units::{format_amount, to_display};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("bsc_wallet=info")),
        )
        .init();

    let wallet = WalletBuilder::from_env()?.build().await?;
    println!("address:  {}", wallet.address_string());
    println!("chain id: {}", wallet.connected_chain_id());

    let balance = wallet.balance().await?;
    println!(
        "balance:  {} BNB (~{:.4})",
        format_amount(balance),
        to_display(balance)
    );

    let fee = wallet.estimate_transfer_fee().await?;
    println!("transfer fee: {} BNB", format_amount(fee));

    Ok(())
}
