use clap::{Args, Parser, Subcommand};

mod command_def;
mod command_handler;
mod confirm;
mod context;
mod formatting;

use crate::command_def::CartCommand;

#[derive(Parser, Debug)]
#[command(version, about = "Command-line client for the Alma storefront")]
pub struct Arguments {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in and remember the session
    Login {
        #[arg(required = true, index = 1)]
        email: String,
        /// Prompted for if not given
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Create an account and sign in
    Register(RegisterParams),
    /// End the session and forget the stored credentials
    Logout,
    /// Show the signed-in customer's profile, or update their shipping address
    Profile {
        #[arg(short, long)]
        address: Option<String>,
    },
    /// List the signed-in customer's orders
    Orders,
    /// Show a single order
    Order {
        #[arg(required = true, index = 1)]
        id: i64,
    },
    /// Replace the cart with the contents of a past order so that its payment can be retried
    Retry {
        #[arg(required = true, index = 1)]
        id: i64,
    },
    #[command(subcommand)]
    /// Inspect or modify the cart
    Cart(CartCommand),
    /// Create an order for the cart and print the checkout widget configuration
    Checkout,
    /// Record the gateway's answer for an order, as the checkout widget does
    Link {
        #[arg(required = true, index = 1)]
        order_id: i64,
        #[arg(required = true, index = 2)]
        reference: String,
        #[arg(short, long)]
        invoice: Option<String>,
    },
    /// Confirm a payment from the gateway's redirect URL (or just its query string)
    Confirm {
        #[arg(required = true, index = 1)]
        redirect: String,
    },
    /// [Admin] List users, optionally filtered by name, email, phone or address
    Users {
        #[arg(short, long)]
        search: Option<String>,
    },
    /// [Admin] Grant or revoke administrator rights
    Admin(AdminParams),
}

#[derive(Debug, Args)]
pub struct RegisterParams {
    #[arg(short, long)]
    name: String,
    #[arg(short, long)]
    email: String,
    /// Prompted for if not given
    #[arg(short, long)]
    password: Option<String>,
    #[arg(long)]
    phone: Option<String>,
}

#[derive(Debug, Args)]
pub struct AdminParams {
    #[arg(required = true, index = 1)]
    user_id: i64,
    #[arg(long, conflicts_with = "revoke", required_unless_present = "revoke")]
    grant: bool,
    #[arg(long)]
    revoke: bool,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::init();
    let cli = Arguments::parse();
    if let Err(e) = command_handler::handle_command(cli.command).await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
