//! Send a message through Postal, then report its delivery attempts.
//!
//! ```sh
//! POSTAL_API_KEY=... POSTAL_BASE_URL=https://postal.yourdomain.com/api/v1 \
//!     RUST_LOG=postal_client=debug cargo run --example send_message -- recipient@example.com
//! ```

use postal_client::{ClientBuilder, MessageExpansion, SendMessageRequest, SendRawRequest};
use std::collections::HashMap;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), postal_client::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let recipient = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "recipient@example.com".to_string());
    let sender = std::env::var("POSTAL_FROM").unwrap_or_else(|_| "sender@yourdomain.com".to_string());

    let client = ClientBuilder::from_env()?.build()?;

    let sent = client
        .send_message(&SendMessageRequest {
            to: vec![recipient.clone()],
            from: sender.clone(),
            subject: "Hello from Postal".to_string(),
            plain_body: Some("This is a test email sent using postal-client.".to_string()),
            html_body: Some("<p>This is a test email sent using <strong>postal-client</strong>.</p>".to_string()),
            headers: HashMap::from([("X-Custom-Header".to_string(), "Custom Value".to_string())]),
            ..Default::default()
        })
        .await?;
    println!("Message sent: id={}, token={}", sent.message_id, sent.token);

    let raw = format!(
        "From: {sender}\r\nTo: {recipient}\r\nSubject: Hello from Postal (raw)\r\nContent-Type: text/plain; charset=utf-8\r\n\r\nThis is a raw RFC 2822 message.\r\n"
    );
    let raw_sent = client
        .send_raw(&SendRawRequest::new(sender, vec![recipient], raw))
        .await?;
    println!("Raw message sent: id={}", raw_sent.message_id);

    let message = client
        .get_message_with_expansions(sent.message_id, &[MessageExpansion::Status])
        .await?;
    println!("Message {} status: {:?}", message.id, message.status);

    let deliveries = client.get_message_deliveries(sent.message_id).await?;
    println!("Message has {} deliveries", deliveries.len());
    for (i, delivery) in deliveries.iter().enumerate() {
        println!(
            "Delivery {} - {} at {}: {}",
            i + 1,
            delivery.status,
            delivery.timestamp,
            delivery.details.as_deref().unwrap_or("")
        );
    }

    Ok(())
}
