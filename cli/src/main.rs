//! Command-line front end for the Splitwise client.
//!
//! Usage:
//!   splitwise --api-key <KEY> me
//!   splitwise groups
//!   splitwise update-user 1313 --set first_name=Ahmad --set locale=fa
//!   splitwise create-expense --cost 25 --description "Grocery run" \
//!     --share 54123:25:15 --share 34262:0:10
//!   splitwise create-expense --cost 10 --share 54123:10:5 \
//!     --share ada@example.com/Ada/Lovelace:0:5
//!   splitwise create-expense --cost 30 --group 110 --split-equally
//!
//! Settings come from flags, then the environment (`SPLITWISE_API_KEY`,
//! `SPLITWISE_BASE_URL`, `SPLITWISE_TIMEOUT_SECS`), then a `.env` file.
//! Every command prints its result as pretty JSON on stdout.

use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use splitwise_core::{
    ApiError, CallContext, Categories, ClientConfig, Currencies, Expense, ExpenseSplitEqually, Expenses,
    Friends, Groups, Splitwise, UserField, UserShare, UserUpdate, Users, SERVER_ADDRESS,
};

#[derive(Parser, Debug)]
#[command(name = "splitwise")]
#[command(about = "Query and update a Splitwise account")]
struct Cli {
    /// API key sent as a bearer token
    #[arg(long, env = "SPLITWISE_API_KEY", hide_env_values = true)]
    api_key: String,

    /// Service root, without the /api/v3.0 prefix
    #[arg(long, env = "SPLITWISE_BASE_URL", default_value = SERVER_ADDRESS)]
    base_url: String,

    /// Per-call deadline in seconds
    #[arg(long, env = "SPLITWISE_TIMEOUT_SECS")]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the authenticated user
    Me,

    /// Show another user's profile
    User { id: u64 },

    /// Change fields of a user (first_name, last_name, email, password, locale, default_currency)
    UpdateUser {
        id: u64,

        /// Field to change in format key=value (can be specified multiple times)
        #[arg(long = "set", value_parser = parse_key_val, required = true)]
        fields: Vec<(String, String)>,
    },

    /// List groups
    Groups,

    /// Show one group
    Group { id: u64 },

    /// List friends
    Friends,

    /// Break off a friendship
    Unfriend { id: u64 },

    /// List expenses
    Expenses,

    /// Show one expense
    Expense { id: u64 },

    /// Create an expense, either split equally in a group or by explicit shares
    CreateExpense {
        #[arg(long)]
        cost: String,

        #[arg(long, default_value = "")]
        description: String,

        #[arg(long, default_value = "")]
        details: String,

        /// ISO 8601 date; the service uses now when empty
        #[arg(long, default_value = "")]
        date: String,

        #[arg(long, default_value = "")]
        repeat_interval: String,

        #[arg(long = "currency", default_value = "")]
        currency_code: String,

        #[arg(long = "category", default_value_t = 0)]
        category_id: u64,

        #[arg(long = "group", default_value_t = 0)]
        group_id: u64,

        /// Participant in format user_id:paid:owed or email/first/last:paid:owed, in index order
        /// (can be specified multiple times)
        #[arg(long = "share", value_parser = parse_share, required_unless_present = "split_equally")]
        shares: Vec<UserShare>,

        /// Split the cost equally among the members of --group
        #[arg(long, conflicts_with = "shares")]
        split_equally: bool,
    },

    /// List supported currencies
    Currencies,

    /// List expense categories
    Categories,
}

/// Parse a key=value pair
fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid key=value pair: {s}"))?;
    Ok((key.to_string(), value.to_string()))
}

/// Parse a user_id:paid:owed or email/first/last:paid:owed share
fn parse_share(s: &str) -> Result<UserShare, String> {
    let mut parts = s.splitn(3, ':');
    let (Some(who), Some(paid), Some(owed)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(format!("invalid share, expected user_id:paid:owed: {s}"));
    };
    if who.contains('@') {
        let mut names = who.splitn(3, '/');
        let email = names.next().unwrap_or_default();
        let first_name = names.next().unwrap_or_default();
        let last_name = names.next().unwrap_or_default();
        return Ok(UserShare::invite(email, first_name, last_name, paid, owed));
    }
    let user_id = who
        .parse()
        .map_err(|_| format!("invalid user id in share: {who}"))?;
    Ok(UserShare::new(user_id, paid, owed))
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "splitwise_core=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<String, String> {
    let mut config = ClientConfig::new(cli.api_key).with_base_url(cli.base_url);
    let ctx = match cli.timeout {
        Some(secs) => {
            let timeout = Duration::from_secs(secs);
            config = config.with_timeout(timeout);
            CallContext::with_timeout(timeout)
        }
        None => CallContext::background(),
    };
    tracing::debug!(?config, "starting");
    let sw = Splitwise::from_config(&config);

    match cli.command {
        Commands::Me => pretty(sw.current_user(&ctx)),
        Commands::User { id } => pretty(sw.user_by_id(&ctx, id)),
        Commands::UpdateUser { id, fields } => {
            let update = user_update(fields)?;
            pretty(sw.update_user(&ctx, id, &update))
        }
        Commands::Groups => pretty(sw.groups(&ctx)),
        Commands::Group { id } => pretty(sw.group_by_id(&ctx, id)),
        Commands::Friends => pretty(sw.friends(&ctx)),
        Commands::Unfriend { id } => pretty(sw.delete_friend(&ctx, id)),
        Commands::Expenses => pretty(sw.expenses(&ctx)),
        Commands::Expense { id } => pretty(sw.expense_by_id(&ctx, id)),
        Commands::CreateExpense {
            cost,
            description,
            details,
            date,
            repeat_interval,
            currency_code,
            category_id,
            group_id,
            shares,
            split_equally,
        } => {
            let expense = Expense {
                cost,
                description,
                details,
                date,
                repeat_interval,
                currency_code,
                category_id,
                group_id,
            };
            if split_equally {
                pretty(sw.create_expense_split_equally(&ctx, &ExpenseSplitEqually::new(expense)))
            } else {
                pretty(sw.create_expense_by_share(&ctx, &expense, &shares))
            }
        }
        Commands::Currencies => pretty(sw.currencies(&ctx)),
        Commands::Categories => pretty(sw.categories(&ctx)),
    }
}

fn user_update(fields: Vec<(String, String)>) -> Result<UserUpdate, String> {
    fields
        .into_iter()
        .map(|(key, value)| {
            UserField::from_key(&key, value).ok_or_else(|| format!("not an updatable user field: {key}"))
        })
        .collect()
}

fn pretty<T: Serialize>(result: Result<T, ApiError>) -> Result<String, String> {
    let value = result.map_err(describe)?;
    serde_json::to_string_pretty(&value).map_err(|e| e.to_string())
}

/// Error text, with the service's payload when it sent one.
fn describe(err: ApiError) -> String {
    match &err {
        ApiError::Unclassified { payload, .. } | ApiError::Rejected(payload) => format!("{err}: {payload}"),
        _ => err.to_string(),
    }
}
