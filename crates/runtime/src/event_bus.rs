/// Ordered queue of typed events.
///
/// Producers push during a call; the owner drains once the call returns. This
/// keeps handlers out of the producer's borrow and makes delivery order
/// deterministic.
#[derive(Debug)]
pub struct EventBus<E> {
    events: Vec<E>,
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self { events: Vec::new() }
    }
}

impl<E> EventBus<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, event: E) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[E] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn drain(&mut self) -> Vec<E> {
        std::mem::take(&mut self.events)
    }
}
