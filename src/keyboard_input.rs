use crate::error::{KinetrackError, Result};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::tty::IsTty;
use std::time::Duration;
use tokio::task;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Keys that end a running session
pub fn is_stop_key(code: KeyCode) -> bool {
    matches!(code, KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc)
}

/// Raw-mode key polling only works when stdin is a terminal
fn ensure_terminal(stdin_is_tty: bool) -> Result<()> {
    if stdin_is_tty {
        Ok(())
    } else {
        Err(KinetrackError::system("Interactive mode needs a terminal on stdin"))
    }
}

/// Terminal key listener that stops a live session early
pub struct KeyboardInputHandler {
    session_token: CancellationToken,
    listener_token: CancellationToken,
}

impl KeyboardInputHandler {
    /// `session_token` is cancelled when the user presses `q` or Esc
    pub fn new(session_token: CancellationToken) -> Self {
        Self {
            session_token,
            listener_token: CancellationToken::new(),
        }
    }

    /// Start listening for key presses on a blocking thread
    pub fn start(&self) -> Result<()> {
        ensure_terminal(std::io::stdin().is_tty())?;
        info!("Press q or Esc to stop the session");

        let session_token = self.session_token.clone();
        let listener_token = self.listener_token.clone();

        task::spawn_blocking(move || {
            if let Err(e) = enable_raw_mode() {
                error!("Failed to enable raw mode for keyboard input: {}", e);
                return;
            }

            while !listener_token.is_cancelled() && !session_token.is_cancelled() {
                match event::poll(Duration::from_millis(100)) {
                    Ok(true) => {
                        let Ok(Event::Key(key_event)) = event::read() else {
                            continue;
                        };
                        if key_event.kind != KeyEventKind::Press {
                            continue;
                        }
                        if is_stop_key(key_event.code) {
                            info!("Stop key pressed, ending session");
                            session_token.cancel();
                        } else {
                            debug!("Key pressed: {:?}", key_event.code);
                        }
                    }
                    Ok(false) => {}
                    Err(e) => {
                        warn!("Error polling for keyboard events: {}", e);
                    }
                }
            }

            if let Err(e) = disable_raw_mode() {
                error!("Failed to disable raw mode: {}", e);
            }
            debug!("Keyboard input handler task exited");
        });

        Ok(())
    }

    /// Stop listening and restore the terminal
    pub async fn stop(&self) -> Result<()> {
        self.listener_token.cancel();

        // Let the poll loop notice and restore the terminal itself
        tokio::time::sleep(Duration::from_millis(200)).await;
        let _ = disable_raw_mode();

        Ok(())
    }
}
