//! The numbered demo scripts for the vault on testnet.
//!
//! Each subcommand submits exactly one contract invocation, signed with a
//! key pair from the environment, and prints the RPC responses. The
//! numbered ones are meant to be run manually and in order:
//!
//! 1. `001-create-offer` registers the offer with the vault.
//! 2. `002-transfer-usdyc` funds the vault with USDyc for sale.
//! 3. `003-deposit` buys USDyc as Alice.
//! 4. `004-approve` lets the vault draw USDC from the distributor.
//! 5. `005-redeem` redeems USDyc for USDC as Alice.
//! 6. `006-update-price` changes the offer price.
//! 7. `007-claim-leftover` returns unsold USDyc to the distributor.
//!
//! `query-offer` reads the offer without submitting anything and
//! `setup-assets` deploys the asset contracts the demo trades.

use stellar_xdr::curr::{Operation, ScVal};
use vault_client::contract::create_stellar_asset_contract;
use vault_client::fixtures::Fixtures;
use vault_client::keys::Keypair;
use vault_client::rpc::Server;
use vault_client::scval::ToScVal;

fn load_fixtures() -> Fixtures {
    Fixtures::from_env().expect("incomplete environment, check the .env values")
}

fn args(values: &[&dyn ToScVal]) -> Vec<ScVal> {
    values
        .iter()
        .map(|value| value.to_scval().expect("invalid contract argument"))
        .collect()
}

/// Submits the invocation and prints what the network answered, like every
/// numbered script does.
async fn invoke_and_print(server: &Server, signer: &Keypair, operation: Operation) {
    let invocation = server
        .invoke(signer, operation)
        .await
        .unwrap_or_else(|error| panic!("invocation failed: {:?}", error));
    println!(
        "{}",
        serde_json::to_string_pretty(&invocation.sent).expect("responses serialize"),
    );
    println!(
        "{}",
        serde_json::to_string_pretty(&invocation.confirmed).expect("responses serialize"),
    );
    if let Some(value) = invocation.confirmed.return_value().expect("invalid result meta") {
        println!("return value: {:?}", value);
    }
}

async fn create_offer(server: &Server) {
    let fixtures = load_fixtures();
    let usdyc_sac = fixtures
        .usdyc
        .contract_id(server.network())
        .expect("asset contract id");
    let usdc_sac = fixtures
        .usdc
        .contract_id(server.network())
        .expect("asset contract id");

    let call = fixtures
        .vault
        .call(
            "create",
            args(&[
                &fixtures.distributor,
                &fixtures.treasury,
                &usdyc_sac,
                &usdc_sac,
                &100u32,
                &100u32,
            ]),
        )
        .expect("invalid call");

    invoke_and_print(server, &fixtures.distributor, call).await;
}

async fn transfer_usdyc(server: &Server) {
    let fixtures = load_fixtures();

    let call = fixtures
        .usdyc_contract
        .call(
            "transfer",
            args(&[
                &fixtures.distributor,
                &fixtures.vault,
                &10_000_000_000i128, // 1000 USDyc
            ]),
        )
        .expect("invalid call");

    invoke_and_print(server, &fixtures.distributor, call).await;
}

async fn deposit(server: &Server) {
    let fixtures = load_fixtures();

    let call = fixtures
        .vault
        .call(
            "deposit",
            args(&[
                &fixtures.alice,
                &100_000_000i128, // 10 USDyc
                &100_000_000i128, // 10
            ]),
        )
        .expect("invalid call");

    invoke_and_print(server, &fixtures.alice, call).await;
}

async fn approve(server: &Server) {
    let fixtures = load_fixtures();

    let call = fixtures
        .usdc_contract
        .call(
            "approve",
            args(&[
                &fixtures.distributor,
                &fixtures.vault,
                &1_000_000_000_000_000i128, // 100000000 USDC
                &u32::MAX,                  // expiration ledger
            ]),
        )
        .expect("invalid call");

    invoke_and_print(server, &fixtures.distributor, call).await;
}

async fn redeem(server: &Server) {
    let fixtures = load_fixtures();

    let call = fixtures
        .vault
        .call(
            "redeem",
            args(&[
                &fixtures.alice,
                &10_000_000i128, // 1 USDyc
                &10_000_000i128, // 1 USDC
            ]),
        )
        .expect("invalid call");

    invoke_and_print(server, &fixtures.alice, call).await;
}

async fn update_price(server: &Server) {
    let fixtures = load_fixtures();

    // 1 USDyc = 2 USDC
    let call = fixtures
        .vault
        .call("updt_price", args(&[&100u32, &200u32]))
        .expect("invalid call");

    invoke_and_print(server, &fixtures.distributor, call).await;
}

async fn claim_leftover(server: &Server) {
    let fixtures = load_fixtures();
    let usdyc_sac = fixtures
        .usdyc
        .contract_id(server.network())
        .expect("asset contract id");

    let call = fixtures
        .vault
        .call(
            "claim",
            args(&[
                &usdyc_sac,
                &10_000_000_000i128, // 1000 USDyc
            ]),
        )
        .expect("invalid call");

    invoke_and_print(server, &fixtures.distributor, call).await;
}

async fn query_offer(server: &Server) {
    let fixtures = load_fixtures();

    let call = fixtures
        .vault
        .call("get_offer", vec![])
        .expect("invalid call");
    let offer = server
        .query(&fixtures.distributor, call)
        .await
        .unwrap_or_else(|error| panic!("query failed: {:?}", error));
    println!("{:#?}", offer);
}

async fn setup_assets(server: &Server) {
    let fixtures = load_fixtures();

    for asset in [&fixtures.usdyc, &fixtures.usdc] {
        let deployed = asset
            .contract_id(server.network())
            .expect("asset contract id");
        println!("deploying {} asset contract at {}", asset.code(), deployed.address());
        invoke_and_print(server, &fixtures.issuer, create_stellar_asset_contract(asset)).await;
    }
}

#[tokio::main]
async fn main() {
    init_tracing();

    let mut args = std::env::args_os();
    args.next(); // program name
    let command = args
        .next()
        .expect("missing subcommand (001-create-offer .. 007-claim-leftover, query-offer, setup-assets)")
        .into_string()
        .expect("unrecognized command");

    let server = Server::testnet();

    match &*command {
        "001-create-offer" => create_offer(&server).await,
        "002-transfer-usdyc" => transfer_usdyc(&server).await,
        "003-deposit" => deposit(&server).await,
        "004-approve" => approve(&server).await,
        "005-redeem" => redeem(&server).await,
        "006-update-price" => update_price(&server).await,
        "007-claim-leftover" => claim_leftover(&server).await,
        "query-offer" => query_offer(&server).await,
        "setup-assets" => setup_assets(&server).await,
        _ => panic!("unknown command \"{}\"", command),
    }
}

fn init_tracing() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    tracing_subscriber::Registry::default()
        .with(tracing_error::ErrorLayer::default())
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::filter::LevelFilter::INFO)
        .init();
}
