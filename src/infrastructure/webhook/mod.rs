mod http_notifier;

pub use http_notifier::{HttpWebhookNotifier, SIGNATURE_HEADER, sign_payload};
