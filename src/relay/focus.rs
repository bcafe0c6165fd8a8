//! Focus Coordinator.
//!
//! Pages backgrounded in the same window as the other tab may ignore input,
//! so before delivering a message the destination tab is brought forward.
//! Focus is advisory: failures are logged and reported as `false`.

use tracing::debug;

use super::host::{BrowserHost, TabId};
use super::registry::TabRegistry;
use crate::error::{HostError, RelayError};

/// Re-resolve both tabs and report whether they share a window.
pub async fn decide_same_window<H: BrowserHost + ?Sized>(
    registry: &TabRegistry,
    host: &H,
) -> Result<bool, HostError> {
    let state = registry.resolve_tabs(host).await?;
    Ok(state.same_window())
}

/// Bring `tab_id`'s window to the foreground and activate the tab.
///
/// Returns `false` instead of failing when the tab is gone or the browser refuses.
pub async fn focus<H: BrowserHost + ?Sized>(host: &H, tab_id: TabId) -> bool {
    match try_focus(host, tab_id).await {
        Ok(()) => true,
        Err(e) => {
            debug!("{}", e);
            false
        }
    }
}

async fn try_focus<H: BrowserHost + ?Sized>(host: &H, tab_id: TabId) -> Result<(), RelayError> {
    let wrap = |source| RelayError::Focus { tab_id, source };

    let tab = host.get_tab(tab_id).await.map_err(wrap)?;
    host.focus_window(tab.window_id).await.map_err(wrap)?;
    host.activate_tab(tab_id).await.map_err(wrap)?;
    Ok(())
}
