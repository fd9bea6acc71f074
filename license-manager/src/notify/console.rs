//! Console-based notifier for development

use license_core::ShareLink;

use super::Notifier;

/// Notifier that prints to the console
pub struct ConsoleNotifier;

impl ConsoleNotifier {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ConsoleNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for ConsoleNotifier {
    fn send(
        &self,
        destination: &str,
        text: &str,
        attachments: &[ShareLink],
    ) -> Result<(), String> {
        println!();
        println!("========================================");
        println!("  MESSAGE FOR: {}", destination);
        println!("----------------------------------------");
        println!("{}", text);
        for link in attachments {
            println!("  [{}] {}", link.label, link.url);
        }
        println!("========================================");
        println!();

        tracing::info!(
            destination = %destination,
            attachments = attachments.len(),
            "Notification sent"
        );

        Ok(())
    }
}
