use anyhow::{anyhow, Result};
use dialoguer::Password;
use epayco_tools::CheckoutWidgetConfig;
use log::*;
use storefront_client::{
    auth,
    cart::{Cart, CartItem},
    checkout::{record_gateway_response, start_checkout},
    data_objects::{ProfileUpdate, RegisterRequest},
};

use crate::{
    command_def::CartCommand,
    confirm::confirm_payment,
    context::AppContext,
    formatting::{format_cart, format_order, format_orders, format_user, format_users},
    AdminParams,
    Command,
    RegisterParams,
};

pub async fn handle_command(command: Command) -> Result<()> {
    let ctx = AppContext::load()?;
    let output = match command {
        Command::Login { email, password } => login(&ctx, email, password).await?,
        Command::Register(params) => register(&ctx, params).await?,
        Command::Logout => {
            auth::logout(&ctx.api, ctx.storage.as_ref()).await?;
            "Logged out".to_string()
        },
        Command::Profile { address } => profile(&ctx, address).await?,
        Command::Orders => format_orders(&ctx.api.my_orders().await?),
        Command::Order { id } => format_order(&ctx.api.order_by_id(id).await?)?,
        Command::Retry { id } => retry_order(&ctx, id).await?,
        Command::Cart(cmd) => handle_cart_command(&ctx, cmd).await?,
        Command::Checkout => checkout(&ctx).await?,
        Command::Link { order_id, reference, invoice } => {
            record_gateway_response(&ctx.api, ctx.storage.as_ref(), order_id, &reference, invoice.as_deref()).await?;
            format!("Reference {reference} recorded for order #{order_id}")
        },
        Command::Confirm { redirect } => confirm_payment(&ctx, &redirect).await?,
        Command::Users { search } => {
            let users = ctx.api.users().await?;
            let query = search.unwrap_or_default();
            let found = users.into_iter().filter(|u| u.matches(&query)).collect::<Vec<_>>();
            format_users(&found)
        },
        Command::Admin(params) => set_admin(&ctx, params).await?,
    };
    println!("{output}");
    Ok(())
}

fn password_or_prompt(password: Option<String>) -> Result<String> {
    match password {
        Some(p) => Ok(p),
        None => Ok(Password::new().with_prompt("Password").interact()?),
    }
}

async fn login(ctx: &AppContext, email: String, password: Option<String>) -> Result<String> {
    let password = password_or_prompt(password)?;
    let user = auth::login(&ctx.api, ctx.storage.as_ref(), &email, &password).await?;
    Ok(format!("Welcome back, {}", user.name))
}

async fn register(ctx: &AppContext, params: RegisterParams) -> Result<String> {
    let password = password_or_prompt(params.password)?;
    let details = RegisterRequest { name: params.name, email: params.email, password, phone: params.phone };
    let user = auth::register(&ctx.api, ctx.storage.as_ref(), details).await?;
    Ok(format!("Account created. Welcome, {}", user.name))
}

async fn profile(ctx: &AppContext, address: Option<String>) -> Result<String> {
    if let Some(address) = address {
        if address.trim().is_empty() {
            return Err(anyhow!("The address cannot be empty"));
        }
        let update = ProfileUpdate { address: Some(address), ..Default::default() };
        ctx.api.update_profile(&update).await?;
        info!("🔑️ Shipping address updated");
    }
    let user = ctx.api.profile().await?;
    format_user(&user)
}

async fn retry_order(ctx: &AppContext, id: i64) -> Result<String> {
    let order = ctx.api.order_by_id(id).await?;
    if order.items.is_empty() {
        return Err(anyhow!("Order #{id} has no items to pay for"));
    }
    let cart = Cart::from_order(&ctx.api, &order).await;
    cart.save(ctx.storage.as_ref())?;
    Ok(format!("Cart rebuilt from order #{id}. Run `sftools checkout` to pay.\n{}", format_cart(&cart)))
}

async fn handle_cart_command(ctx: &AppContext, command: CartCommand) -> Result<String> {
    let storage = ctx.storage.as_ref();
    let mut cart = Cart::load(storage);
    match command {
        CartCommand::List => return Ok(format_cart(&cart)),
        CartCommand::Add { product_id, quantity } => {
            let product = ctx.api.product(product_id).await?;
            let item = CartItem {
                quantity,
                category: product.category,
                ..CartItem::new(product.id, &product.name, product.price_number)
            };
            cart.add(item);
        },
        CartCommand::Remove { product_id } => {
            if cart.remove(product_id).is_none() {
                return Err(anyhow!("Product {product_id} is not in the cart"));
            }
        },
        CartCommand::Qty { product_id, quantity } => {
            if !cart.update_quantity(product_id, quantity) {
                return Err(anyhow!("Product {product_id} is not in the cart"));
            }
        },
        CartCommand::Clear => cart.clear(),
    }
    cart.save(storage)?;
    Ok(format_cart(&cart))
}

async fn checkout(ctx: &AppContext) -> Result<String> {
    let cart = Cart::load(ctx.storage.as_ref());
    let test_mode = ctx.gateway_config.test_mode;
    let session = start_checkout(&ctx.api, ctx.storage.as_ref(), &cart, test_mode).await?;
    let widget = CheckoutWidgetConfig::on_page(&session.session_id, test_mode);
    let widget = serde_json::to_string_pretty(&widget)?;
    let order = session.order_id.map(|id| format!("Order #{id}")).unwrap_or_else(|| "Standalone session".into());
    Ok(format!(
        "{order}. Total {}\nOpen the checkout widget ({}) with:\n{widget}",
        cart.total(),
        ctx.gateway_config.checkout_script
    ))
}

async fn set_admin(ctx: &AppContext, params: AdminParams) -> Result<String> {
    let grant = params.grant && !params.revoke;
    let user = ctx.api.set_admin(params.user_id, grant).await?;
    let action = if grant { "is now" } else { "is no longer" };
    Ok(format!("{} {action} an administrator", user.email))
}
