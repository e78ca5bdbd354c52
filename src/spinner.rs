//! A terminal spinner shown while a task is running remotely.

use std::io::Write;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Braille spinner frames.
const FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Frame interval.
const INTERVAL: Duration = Duration::from_millis(80);

/// A spinner on stderr whose label can change while it spins.
///
/// Call [`Spinner::start`] to begin, [`Spinner::set_label`] as the task
/// progresses, and [`Spinner::stop`] when done. `None` in the channel
/// means stop.
pub struct Spinner {
    handle: JoinHandle<()>,
    label: watch::Sender<Option<String>>,
}

impl Spinner {
    pub fn start(label: &str) -> Self {
        let (tx, mut rx) = watch::channel(Some(label.to_string()));

        let handle = tokio::spawn(async move {
            let mut i = 0;
            loop {
                let Some(label) = rx.borrow_and_update().clone() else {
                    break;
                };
                let frame = FRAMES[i % FRAMES.len()];
                // \x1b[2K clears the line, \r returns to its start
                eprint!("\x1b[2K\r{frame} {label}");
                let _ = std::io::stderr().flush();

                tokio::select! {
                    _ = tokio::time::sleep(INTERVAL) => {}
                    changed = rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
                i += 1;
            }
            eprint!("\x1b[2K\r");
            let _ = std::io::stderr().flush();
        });

        Self { handle, label: tx }
    }

    /// Replace the text shown next to the spinner.
    pub fn set_label(&self, label: impl Into<String>) {
        let _ = self.label.send(Some(label.into()));
    }

    /// Stop the spinner and clear its line.
    pub async fn stop(self) {
        let _ = self.label.send(None);
        let _ = self.handle.await;
    }
}
