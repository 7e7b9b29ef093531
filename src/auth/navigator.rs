// Leaving the current page load for the identity provider
use crate::error::IdentityError;
use std::sync::atomic::{AtomicBool, Ordering};
use url::Url;

/// Sends the user's browser somewhere else
pub trait Navigator: Send + Sync {
    fn navigate(&self, url: &Url) -> Result<(), IdentityError>;
}

/// Global flag to force headless mode (set by --headless CLI flag)
static FORCE_HEADLESS: AtomicBool = AtomicBool::new(false);

pub fn set_headless_override(headless: bool) {
    FORCE_HEADLESS.store(headless, Ordering::Relaxed);
}

/// Opens the system browser, or prints the URL when no browser is usable
#[derive(Debug, Default)]
pub struct BrowserNavigator;

impl BrowserNavigator {
    /// SSH sessions, CI, dumb terminals and (outside macOS) missing X11 count as headless
    fn is_headless(lookup: impl Fn(&str) -> Option<String>) -> bool {
        if FORCE_HEADLESS.load(Ordering::Relaxed) {
            return true;
        }
        if ["SSH_TTY", "SSH_CONNECTION", "CI"]
            .iter()
            .any(|key| lookup(key).is_some())
        {
            return true;
        }
        if let Some(term) = lookup("TERM") {
            if term == "dumb" || term.is_empty() {
                return true;
            }
        }
        #[cfg(not(target_os = "macos"))]
        {
            if lookup("DISPLAY").is_none() {
                return true;
            }
        }
        false
    }
}

impl Navigator for BrowserNavigator {
    fn navigate(&self, url: &Url) -> Result<(), IdentityError> {
        if Self::is_headless(|key| std::env::var(key).ok()) {
            tracing::debug!("Headless environment; printing sign-in URL");
            eprintln!("\nOpen this URL in a browser to continue:\n  {}\n", url);
            return Ok(());
        }

        tracing::debug!("Opening browser at {}", url);
        if let Err(e) = webbrowser::open(url.as_str()) {
            eprintln!("Could not open browser automatically: {}", e);
            eprintln!("Open this URL manually:\n  {}\n", url);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_headless_detection() {
        assert!(BrowserNavigator::is_headless(env(&[("SSH_TTY", "/dev/pts/0"), ("DISPLAY", ":0")])));
        assert!(BrowserNavigator::is_headless(env(&[("CI", "1"), ("DISPLAY", ":0")])));
        assert!(BrowserNavigator::is_headless(env(&[("TERM", "dumb"), ("DISPLAY", ":0")])));
        assert!(!BrowserNavigator::is_headless(env(&[("TERM", "xterm"), ("DISPLAY", ":0")])));
    }
}
