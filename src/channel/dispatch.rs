//! Routing of server-pushed messages.
//!
//! `invoke` replies stay with the actor (they complete pending calls); the
//! dispatcher handles the three push shapes: actions run against the page
//! host exactly once, events broadcast unconditionally, queue entries pass
//! the page-constraint gate first.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::core::envelope::{EventPush, PageAction, QueuePush};
use crate::page::{PageHost, redirect_allowed};

/// Server pushes surfaced to subscribers after gating.
#[derive(Debug, Clone)]
pub enum ServerPush {
    Event(EventPush),
    Queue(QueuePush),
}

pub struct Dispatcher<H>
where
    H: PageHost,
{
    page: Arc<H>,
    pushes: broadcast::Sender<ServerPush>,
}

impl<H> Dispatcher<H>
where
    H: PageHost,
{
    pub fn new(page: Arc<H>, push_capacity: usize) -> Self {
        let (pushes, _) = broadcast::channel(push_capacity);
        Self { page, pushes }
    }

    pub fn page(&self) -> &Arc<H> {
        &self.page
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerPush> {
        self.pushes.subscribe()
    }

    /// Execute a fire-and-forget action. Called once per inbound message, so
    /// at-most-once execution is structural.
    pub fn run_action(&self, action: PageAction) {
        match action {
            PageAction::Reload => self.page.reload(),
            PageAction::Redirect(url) => {
                if redirect_allowed(&url) {
                    self.page.redirect(&url);
                } else {
                    warn!(url = %url, "refusing redirect to disallowed scheme");
                }
            }
            PageAction::Submit => self.page.submit_primary_form(),
        }
    }

    /// Broadcast a named event. No ordering guarantee relative to other
    /// kinds; subscribers that lag simply miss old entries.
    pub fn broadcast_event(&self, event: EventPush) {
        let _ = self.pushes.send(ServerPush::Event(event));
    }

    /// Deliver a queue entry unless its page constraint mismatches the page
    /// displayed right now. Entries addressed to a page the client has since
    /// left are dropped, not buffered.
    pub fn deliver_queued(&self, queue: QueuePush) {
        if let Some(constraint) = queue.entry.constraint.as_deref() {
            let current = self.page.current_page();
            if current.as_deref() != Some(constraint) {
                debug!(
                    constraint = %constraint,
                    current = current.as_deref().unwrap_or("<none>"),
                    "dropping stale queue entry"
                );
                return;
            }
        }
        let _ = self.pushes.send(ServerPush::Queue(queue));
    }
}
