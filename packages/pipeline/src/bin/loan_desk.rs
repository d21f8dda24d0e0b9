//! CLI for driving loan desk operations by hand
//!
//! Every command publishes its event to the configured log when the broker is
//! reachable, and prints the result as JSON.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use pipeline_core::common::telemetry::init_tracing;
use pipeline_core::domains::customers::KycCheck;
use pipeline_core::domains::decision::{NegotiationTerms, SanctionTerms, UnderwritingVerdict};
use pipeline_core::kernel::ConnectionState;
use pipeline_core::{Config, LoanDesk};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser)]
#[command(name = "loan_desk")]
#[command(about = "Run loan desk operations and publish their events")]
struct Cli {
    /// Seconds to wait for the event log before running without it
    #[arg(long, default_value_t = 10)]
    connect_timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a phone number and stated address against the customer records
    Kyc { phone: String, address: String },

    /// Send an OTP and verify the code typed on stdin
    Otp { phone: String },

    /// Quote an interest rate for a requested amount
    Negotiate { amount: f64, limit: f64 },

    /// Run the underwriting rules
    Underwrite {
        score: u32,
        amount: f64,
        limit: f64,
        #[arg(long, default_value_t = 0.0)]
        salary: f64,
    },

    /// Look up the pre-approved offer for a customer
    Offer { customer_id: String },

    /// Look up the credit score for a customer
    Credit { customer_id: String },

    /// Fix final terms and installment
    Sanction {
        name: String,
        amount: f64,
        tenure: u32,
        rate: f64,
    },

    /// Full application for the customer registered to a phone number
    Apply {
        phone: String,
        amount: f64,
        /// Address as stated by the applicant
        #[arg(long)]
        address: String,
        #[arg(long, default_value_t = 60)]
        tenure: u32,
        #[arg(long, default_value_t = 0.0)]
        salary: f64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("info,pipeline_core=debug");

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let desk = LoanDesk::from_config(&config)?;

    let publisher = desk.publisher().clone();
    publisher.start();
    let connected = tokio::time::timeout(
        Duration::from_secs(cli.connect_timeout),
        publisher.wait_for_state(ConnectionState::Connected),
    )
    .await;
    if connected.is_err() {
        tracing::warn!(
            broker = %config.event_broker,
            "Event log not reachable yet; events will be dropped until it is"
        );
    }

    let outcome = run(&desk, cli.command).await;
    publisher.shutdown().await;
    outcome
}

async fn run(desk: &LoanDesk, command: Commands) -> Result<()> {
    match command {
        Commands::Kyc { phone, address } => {
            print_json(&desk.verify_customer(&phone, &address).await)
        }
        Commands::Otp { phone } => {
            let verified = verify_phone(desk, &phone).await?;
            print_json(&serde_json::json!({ "phone": phone, "verified": verified }))
        }
        Commands::Negotiate { amount, limit } => print_json(&desk.negotiate(amount, limit).await),
        Commands::Underwrite {
            score,
            amount,
            limit,
            salary,
        } => print_json(&desk.underwrite(score, amount, limit, salary).await),
        Commands::Offer { customer_id } => print_json(&desk.check_offer(&customer_id).await?),
        Commands::Credit { customer_id } => print_json(&desk.check_credit(&customer_id).await?),
        Commands::Sanction {
            name,
            amount,
            tenure,
            rate,
        } => print_json(&desk.sanction(&name, amount, tenure, rate).await?),
        Commands::Apply {
            phone,
            amount,
            address,
            tenure,
            salary,
        } => apply(desk, &phone, &address, amount, tenure, salary).await,
    }
}

async fn apply(
    desk: &LoanDesk,
    phone: &str,
    address: &str,
    amount: f64,
    tenure: u32,
    salary: f64,
) -> Result<()> {
    let kyc = desk.verify_customer(phone, address).await;
    let (customer_id, customer_name) = match &kyc {
        KycCheck::Matched {
            address_match: true,
            customer_id,
            customer_name,
            ..
        } => (customer_id.clone(), customer_name.clone()),
        KycCheck::Matched { .. } => bail!("Stated address does not match our records"),
        KycCheck::Unknown { reason, .. } => bail!("KYC failed for {}: {}", phone, reason),
    };

    if !verify_phone(desk, phone).await? {
        bail!("Phone verification failed");
    }

    let offer = desk.check_offer(&customer_id).await?;
    let credit = desk.check_credit(&customer_id).await?;
    let terms = desk.negotiate(amount, offer.pre_approved_limit).await;
    let verdict = desk
        .underwrite(credit.credit_score, amount, offer.pre_approved_limit, salary)
        .await;

    let sanction = if verdict.is_approved() {
        Some(
            desk.sanction(&customer_name, amount, tenure, terms.interest_rate)
                .await?,
        )
    } else {
        None
    };

    print_json(&Application {
        kyc: &kyc,
        negotiation: &terms,
        underwriting: &verdict,
        sanction: sanction.as_ref(),
    })
}

async fn verify_phone(desk: &LoanDesk, phone: &str) -> Result<bool> {
    desk.generate_otp(phone).await;

    println!("Enter the OTP sent to {}:", phone);
    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .context("Failed to read OTP from stdin")?;

    Ok(desk.validate_otp(phone, line.trim()).await)
}

#[derive(Serialize)]
struct Application<'a> {
    kyc: &'a KycCheck,
    negotiation: &'a NegotiationTerms,
    underwriting: &'a UnderwritingVerdict,
    #[serde(skip_serializing_if = "Option::is_none")]
    sanction: Option<&'a SanctionTerms>,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize result")?;
    println!("{}", json);
    Ok(())
}
