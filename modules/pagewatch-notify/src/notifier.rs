use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use pagewatch_common::Monitor;

use crate::message;
use crate::presenter::{LogPresenter, Presenter};
use crate::webhook::{DeliveryOutcome, WebhookSender};

/// What went out for one change. Both channels are independent; either can
/// be off or fail without affecting the other.
#[derive(Debug, Default)]
pub struct NotifyReport {
    pub local_shown: bool,
    pub webhook: Option<DeliveryOutcome>,
}

/// Seam between the check pipeline and delivery, so tests can record
/// dispatches instead of performing them.
#[async_trait]
pub trait ChangeNotifier: Send + Sync {
    async fn notify(&self, monitor: &Monitor, new_items_text: &str) -> NotifyReport;
}

/// Production notifier: local alert via a [`Presenter`] plus an optional
/// webhook delivery.
pub struct Notifier {
    presenter: Box<dyn Presenter>,
    webhook: WebhookSender,
}

impl Notifier {
    pub fn new(webhook_min_interval: Duration) -> Result<Self> {
        Ok(Self {
            presenter: Box::new(LogPresenter),
            webhook: WebhookSender::new(webhook_min_interval)?,
        })
    }

    pub fn with_presenter(
        presenter: Box<dyn Presenter>,
        webhook_min_interval: Duration,
    ) -> Result<Self> {
        Ok(Self {
            presenter,
            webhook: WebhookSender::new(webhook_min_interval)?,
        })
    }
}

#[async_trait]
impl ChangeNotifier for Notifier {
    async fn notify(&self, monitor: &Monitor, new_items_text: &str) -> NotifyReport {
        let mut report = NotifyReport::default();

        if monitor.popup_enabled {
            let title = format!("{} was updated", monitor.name);
            let body = message::preview(new_items_text);
            self.presenter.show_alert(&title, &body);
            report.local_shown = true;
        }
        // The audio toggle is independent of the popup toggle.
        if monitor.audio_enabled {
            self.presenter.play_sound();
        }

        if let Some(endpoint) = &monitor.webhook_url {
            report.webhook = Some(
                self.webhook
                    .send(endpoint, &monitor.name, &monitor.url, new_items_text)
                    .await,
            );
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct RecordingPresenter {
        alerts: Arc<Mutex<Vec<(String, String)>>>,
        sounds: Arc<Mutex<usize>>,
    }

    impl Presenter for RecordingPresenter {
        fn show_alert(&self, title: &str, body: &str) {
            self.alerts
                .lock()
                .unwrap()
                .push((title.to_string(), body.to_string()));
        }

        fn play_sound(&self) {
            *self.sounds.lock().unwrap() += 1;
        }
    }

    fn notifier(presenter: &RecordingPresenter) -> Notifier {
        Notifier::with_presenter(Box::new(presenter.clone()), Duration::from_millis(1)).unwrap()
    }

    fn monitor() -> Monitor {
        Monitor::new("m1", "Deals", "https://example.com/deals")
    }

    #[tokio::test]
    async fn popup_and_sound_both_fire_by_default() {
        let presenter = RecordingPresenter::default();
        let report = notifier(&presenter)
            .notify(&monitor(), "Big new offer today")
            .await;

        assert!(report.local_shown);
        assert!(report.webhook.is_none());
        let alerts = presenter.alerts.lock().unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].0, "Deals was updated");
        assert_eq!(*presenter.sounds.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn sound_plays_even_with_popup_disabled() {
        let presenter = RecordingPresenter::default();
        let mut m = monitor();
        m.popup_enabled = false;
        let report = notifier(&presenter).notify(&m, "Big new offer today").await;

        assert!(!report.local_shown);
        assert!(presenter.alerts.lock().unwrap().is_empty());
        assert_eq!(*presenter.sounds.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn audio_off_silences_sound_but_keeps_popup() {
        let presenter = RecordingPresenter::default();
        let mut m = monitor();
        m.audio_enabled = false;
        let report = notifier(&presenter).notify(&m, "Big new offer today").await;

        assert!(report.local_shown);
        assert_eq!(presenter.alerts.lock().unwrap().len(), 1);
        assert_eq!(*presenter.sounds.lock().unwrap(), 0);
    }
}
