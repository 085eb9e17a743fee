use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;

use super::{CheckoutSession, PaymentProvider, SessionRequest};
use crate::services::booking::PAYMENT_WINDOW_MINUTES;

pub struct StripeCheckoutProvider {
    secret_key: String,
    currency: String,
    frontend_url: String,
    business_name: String,
    client: reqwest::Client,
}

impl StripeCheckoutProvider {
    pub fn new(
        secret_key: String,
        currency: String,
        frontend_url: String,
        business_name: String,
    ) -> Self {
        Self {
            secret_key,
            currency,
            frontend_url,
            business_name,
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Deserialize)]
struct SessionResponse {
    id: String,
    url: String,
}

#[async_trait]
impl PaymentProvider for StripeCheckoutProvider {
    async fn create_session(&self, request: &SessionRequest) -> anyhow::Result<CheckoutSession> {
        let amount_cents = ((request.amount * 100.0).round() as i64).to_string();
        let expires_at =
            (chrono::Utc::now().timestamp() + PAYMENT_WINDOW_MINUTES * 60).to_string();
        let product_name = format!("{} - {}", self.business_name, request.service_name);
        let description = format!("Reservation for {}", request.client_name);
        let success_url = format!(
            "{}/booking-success?reservation_id={}",
            self.frontend_url, request.reservation_id
        );
        let cancel_url = format!(
            "{}/booking-cancelled?reservation_id={}",
            self.frontend_url, request.reservation_id
        );

        let form = [
            ("mode", "payment"),
            ("payment_method_types[0]", "card"),
            ("customer_email", request.client_email.as_str()),
            ("line_items[0][price_data][currency]", self.currency.as_str()),
            ("line_items[0][price_data][product_data][name]", product_name.as_str()),
            (
                "line_items[0][price_data][product_data][description]",
                description.as_str(),
            ),
            ("line_items[0][price_data][unit_amount]", amount_cents.as_str()),
            ("line_items[0][quantity]", "1"),
            ("metadata[reservation_id]", request.reservation_id.as_str()),
            ("success_url", success_url.as_str()),
            ("cancel_url", cancel_url.as_str()),
            ("expires_at", expires_at.as_str()),
        ];

        let session: SessionResponse = self
            .client
            .post("https://api.stripe.com/v1/checkout/sessions")
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&form)
            .send()
            .await
            .context("failed to reach Stripe")?
            .error_for_status()
            .context("Stripe API returned error")?
            .json()
            .await
            .context("failed to decode Stripe session")?;

        Ok(CheckoutSession {
            id: session.id,
            url: session.url,
        })
    }
}
