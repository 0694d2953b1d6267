use protocol::PersistenceRequest;

/// Queue of persistence requests awaiting the transport.
///
/// The engine never performs I/O: command methods push here, the embedding
/// transport drains and sends, then reports results back through
/// `Session::complete` / `Session::apply_snapshot`.
#[derive(Debug, Default)]
pub struct Outbound {
    queue: Vec<PersistenceRequest>,
}

impl Outbound {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, request: PersistenceRequest) {
        self.queue.push(request);
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn peek(&self) -> &[PersistenceRequest] {
        &self.queue
    }

    pub fn drain(&mut self) -> Vec<PersistenceRequest> {
        std::mem::take(&mut self.queue)
    }
}
