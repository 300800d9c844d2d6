use clap::Subcommand;

#[derive(Debug, Subcommand)]
pub enum CartCommand {
    /// Show the cart
    List,
    /// Add a product from the catalogue. Adding a product that is already in the cart increases its quantity.
    Add {
        #[arg(required = true, index = 1)]
        product_id: i64,
        #[arg(short, long, default_value = "1")]
        quantity: u32,
    },
    /// Remove a product from the cart
    Remove {
        #[arg(required = true, index = 1)]
        product_id: i64,
    },
    /// Set the quantity for a product. A quantity of 0 removes it.
    Qty {
        #[arg(required = true, index = 1)]
        product_id: i64,
        #[arg(required = true, index = 2)]
        quantity: u32,
    },
    /// Empty the cart
    Clear,
}
