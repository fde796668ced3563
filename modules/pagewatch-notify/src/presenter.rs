use tracing::info;

/// Platform notification surface. The real popup/audio presentation lives
/// outside this system; implementations are fire-and-forget and must not
/// fail the caller.
pub trait Presenter: Send + Sync {
    fn show_alert(&self, title: &str, body: &str);
    fn play_sound(&self);
}

/// Default presenter: structured log lines instead of a desktop popup.
pub struct LogPresenter;

impl Presenter for LogPresenter {
    fn show_alert(&self, title: &str, body: &str) {
        info!(title, body, "Local alert");
    }

    fn play_sound(&self) {
        info!("Notification sound");
    }
}
