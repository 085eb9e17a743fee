pub mod resend;

use async_trait::async_trait;

use crate::models::Reservation;

#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()>;
}

// Notifications are best-effort: a failed send is logged and never rolls
// back the reservation transition that triggered it.

pub async fn send_confirmation(
    sender: &dyn NotificationSender,
    business_name: &str,
    reservation: &Reservation,
    barber_name: &str,
    service_name: &str,
) {
    let subject = format!("{business_name}: booking confirmed");
    let body = format!(
        "Hi {},\n\nYour booking is confirmed.\n\nService: {}\nBarber: {}\nWhen: {}\n\nSee you soon!\n{}",
        reservation.client_name,
        service_name,
        barber_name,
        reservation.start_at.format("%A %d %B, %H:%M"),
        business_name,
    );
    deliver(sender, &reservation.client_email, &subject, &body).await;
}

pub async fn send_cancellation(
    sender: &dyn NotificationSender,
    business_name: &str,
    reservation: &Reservation,
) {
    let subject = format!("{business_name}: booking cancelled");
    let body = format!(
        "Hi {},\n\nYour booking for {} has been cancelled.\n\nYou can book a new time any moment.\n{}",
        reservation.client_name,
        reservation.start_at.format("%A %d %B, %H:%M"),
        business_name,
    );
    deliver(sender, &reservation.client_email, &subject, &body).await;
}

pub async fn send_reminder(
    sender: &dyn NotificationSender,
    business_name: &str,
    reservation: &Reservation,
    barber_name: &str,
) -> anyhow::Result<()> {
    let subject = format!("{business_name}: see you tomorrow");
    let body = format!(
        "Hi {},\n\nA reminder of your appointment with {} on {}.\n\n{}",
        reservation.client_name,
        barber_name,
        reservation.start_at.format("%A %d %B, %H:%M"),
        business_name,
    );
    sender
        .send_email(&reservation.client_email, &subject, &body)
        .await
}

async fn deliver(sender: &dyn NotificationSender, to: &str, subject: &str, body: &str) {
    if let Err(e) = sender.send_email(to, subject, body).await {
        tracing::error!(error = %e, to = %to, subject = %subject, "failed to send notification");
    }
}
