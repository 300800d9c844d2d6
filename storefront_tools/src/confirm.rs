use std::{sync::Arc, time::Duration};

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use storefront_client::confirmation::{ConfirmationView, PaymentConfirmation};

use crate::{context::AppContext, formatting::format_payment_summary};

fn spinner(message: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_style(
        ProgressStyle::with_template("{spinner:5} {msg} [{elapsed}]")?
            .tick_strings(&["🕛 ", "🕐 ", "🕑 ", "🕒 ", "🕓 ", "🕔 ", "🕕 ", "🕖 ", "🕗 ", "🕘 ", "🕙 ", "🕚 "]),
    );
    pb.set_message(message.to_string());
    Ok(pb)
}

/// Runs the confirmation page for a redirect and follows it until the order stops changing.
pub async fn confirm_payment(ctx: &AppContext, redirect: &str) -> Result<String> {
    let gateway = ctx.gateway()?;
    let page = PaymentConfirmation::new(gateway, ctx.api.clone(), Arc::clone(&ctx.storage), ctx.config.polling);
    let pb = spinner("Looking up payment...")?;
    let mut rx = page.subscribe();
    let view = page.activate(redirect).await;
    if !matches!(view, ConfirmationView::Detail(_)) {
        pb.finish_and_clear();
        return Ok("No payment information found for this redirect.".to_string());
    }

    while page.is_polling() {
        let status = rx.borrow_and_update().order_status.as_ref().map(|s| s.label().to_string());
        pb.set_message(format!(
            "Waiting for the store to confirm the payment. Order status: {}",
            status.as_deref().unwrap_or("-")
        ));
        if rx.changed().await.is_err() {
            break;
        }
    }
    page.teardown();
    pb.finish_and_clear();

    let mut out = match page.view() {
        ConfirmationView::Detail(summary) => format_payment_summary(&summary)?,
        _ => "No payment information found for this redirect.".to_string(),
    };
    if page.cart_cleared() {
        out.push_str("Your cart has been emptied.\n");
    }
    Ok(out)
}
