use store::ClientId;

/// Verdict on an inbound viewport notification.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum InboundVerdict {
    Apply,
    /// Our own write echoed back by the server.
    DropSelfEcho,
    /// Older than the staleness window behind the last local write.
    DropStale,
}

/// Verdict on a GIS drag-pan proposal.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum GisVerdict {
    /// Forward to persistence; the server notification is the source of
    /// truth, so nothing is written locally.
    Forward,
    /// Another writer currently owns the viewport.
    RejectInteractionGuard,
}

/// Single-writer arbitration for the viewport.
///
/// At most one surface may drive the viewport at a time; the arbiter keeps
/// GIS drag-pan and remote velocity/discrete commands from overwriting each
/// other every frame, and filters inbound notifications that would feed
/// back our own writes or arrive out of order.
#[derive(Debug)]
pub struct InteractionArbiter {
    client_id: ClientId,
    staleness_window_ms: f64,
    last_local_write_ms: Option<f64>,
}

impl InteractionArbiter {
    pub fn new(client_id: ClientId, staleness_window_ms: f64) -> Self {
        Self {
            client_id,
            staleness_window_ms,
            last_local_write_ms: None,
        }
    }

    pub fn client_id(&self) -> &ClientId {
        &self.client_id
    }

    pub fn last_local_write_ms(&self) -> Option<f64> {
        self.last_local_write_ms
    }

    /// Record a local viewport write. Timestamps never move backwards.
    pub fn note_local_write(&mut self, now_ms: f64) {
        let last = self.last_local_write_ms.unwrap_or(f64::NEG_INFINITY);
        if now_ms > last {
            self.last_local_write_ms = Some(now_ms);
        }
    }

    pub fn gis_verdict(&self, drive_moving: bool, remote_in_flight: bool) -> GisVerdict {
        if drive_moving || remote_in_flight {
            GisVerdict::RejectInteractionGuard
        } else {
            GisVerdict::Forward
        }
    }

    pub fn filter_viewport_notification(
        &self,
        source_id: &ClientId,
        timestamp_ms: f64,
    ) -> InboundVerdict {
        if *source_id == self.client_id {
            return InboundVerdict::DropSelfEcho;
        }
        if let Some(last) = self.last_local_write_ms
            && timestamp_ms < last - self.staleness_window_ms
        {
            return InboundVerdict::DropStale;
        }
        InboundVerdict::Apply
    }
}
