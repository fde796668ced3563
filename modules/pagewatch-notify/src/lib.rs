//! Notification dispatch: a local alert surface and a rate-limited webhook
//! channel, combined behind the [`ChangeNotifier`] trait. Delivery is
//! best-effort: failures are logged and reported as outcomes, never
//! propagated to the check pipeline.

pub mod message;
pub mod notifier;
pub mod pacer;
pub mod presenter;
pub mod webhook;

pub use notifier::{ChangeNotifier, NotifyReport, Notifier};
pub use presenter::{LogPresenter, Presenter};
pub use webhook::{DeliveryOutcome, WebhookSender};
