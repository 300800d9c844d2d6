use std::fmt::Write;

use anyhow::Result;
use prettytable::{
    format::{LinePosition, LineSeparator, TableFormat},
    row,
    Table,
};
use storefront_client::{
    cart::Cart,
    confirmation::PaymentSummary,
    data_objects::{Order, User},
};

fn markdown_format() -> TableFormat {
    prettytable::format::FormatBuilder::new()
        .column_separator('|')
        .borders('|')
        .separator(LinePosition::Title, LineSeparator::new('-', '|', '|', '|'))
        .padding(1, 1)
        .build()
}

fn markdown_table() -> Table {
    let mut table = Table::new();
    table.set_format(markdown_format());
    table
}

fn order_date(order: &Order) -> String {
    match order.created() {
        Some(d) => d.format("%d/%m/%Y").to_string(),
        None => order.created_at.clone().unwrap_or_else(|| "-".to_string()),
    }
}

pub fn format_orders(orders: &[Order]) -> String {
    if orders.is_empty() {
        return "No orders yet".to_string();
    }
    let mut table = markdown_table();
    table.set_titles(row!["ID", "Products", "Total", "Status", "Date"]);
    orders.iter().for_each(|o| {
        table.add_row(row![o.id, o.product_label(), o.total, o.status.label(), order_date(o)]);
    });
    table.to_string()
}

pub fn format_order(order: &Order) -> Result<String> {
    let mut f = String::new();
    writeln!(f, "===============================================================================")?;
    writeln!(f, "Order #{}  [{}]  {}", order.id, order.status.label(), order_date(order))?;
    writeln!(f, "===============================================================================")?;
    let mut table = markdown_table();
    table.set_titles(row!["Product", "Name", "Qty", "Unit price", "Subtotal"]);
    order.items.iter().for_each(|i| {
        table.add_row(row![i.id, i.name, i.quantity, i.unit_price, i.subtotal()]);
    });
    writeln!(f, "{table}")?;
    writeln!(f, "Total: {}", order.total)?;
    Ok(f)
}

pub fn format_cart(cart: &Cart) -> String {
    if cart.is_empty() {
        return "The cart is empty".to_string();
    }
    let mut table = markdown_table();
    table.set_titles(row!["Product", "Name", "Qty", "Unit price", "Subtotal"]);
    cart.items().iter().for_each(|i| {
        table.add_row(row![i.product_id, i.name, i.quantity, i.unit_price, i.subtotal()]);
    });
    format!("{table}\n{} items. Total: {}", cart.item_count(), cart.total())
}

pub fn format_user(user: &User) -> Result<String> {
    let mut f = String::new();
    writeln!(f, "Name: {}", user.name)?;
    writeln!(f, "Email: {}", user.email)?;
    writeln!(f, "Phone: {}", user.phone.as_deref().unwrap_or("-"))?;
    writeln!(f, "Address: {}", user.address.as_deref().unwrap_or("-"))?;
    if let Some(bio) = &user.bio {
        writeln!(f, "Bio: {bio}")?;
    }
    if user.is_admin {
        writeln!(f, "Administrator")?;
    }
    Ok(f)
}

pub fn format_users(users: &[User]) -> String {
    if users.is_empty() {
        return "No users found".to_string();
    }
    let mut table = markdown_table();
    table.set_titles(row!["ID", "Name", "Email", "Phone", "Address", "Admin"]);
    users.iter().for_each(|u| {
        let id = u.id.map(|id| id.to_string()).unwrap_or_default();
        let admin = if u.is_admin { "yes" } else { "" };
        table.add_row(row![
            id,
            u.name,
            u.email,
            u.phone.as_deref().unwrap_or("-"),
            u.address.as_deref().unwrap_or("-"),
            admin
        ]);
    });
    table.to_string()
}

pub fn format_payment_summary(summary: &PaymentSummary) -> Result<String> {
    let mut f = String::new();
    let headline = if summary.successful { "✅️ Payment successful" } else { "⏳️ Payment not confirmed" };
    writeln!(f, "{headline}")?;
    let status = summary.order_status.as_ref().map(|s| s.label()).unwrap_or(summary.status.as_str());
    writeln!(f, "Status:      {status}")?;
    if let Some(state) = &summary.gateway_state {
        writeln!(f, "Gateway:     {state}")?;
    }
    writeln!(f, "Reference:   {}", summary.reference)?;
    writeln!(f, "Description: {}", summary.description)?;
    writeln!(f, "Date:        {}", summary.date)?;
    writeln!(f, "Amount:      {} ({})", summary.amount, summary.currency)?;
    writeln!(f, "Method:      {}", summary.payment_method)?;
    Ok(f)
}
