/// An ordered group of validated addresses sent in one outbound call.
///
/// Only the accumulator builds batches, so `1 <= len <= max_batch_size` holds
/// for every batch that reaches the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    sequence: u64,
    addresses: Vec<String>,
}

impl Batch {
    /// Position of this batch in the run, starting at 1.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn addresses(&self) -> &[String] {
        &self.addresses
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    pub fn into_addresses(self) -> Vec<String> {
        self.addresses
    }
}

/// Collects accepted addresses into fixed-size batches in arrival order.
#[derive(Debug)]
pub struct BatchAccumulator {
    max_batch_size: usize,
    pending: Vec<String>,
    next_sequence: u64,
}

impl BatchAccumulator {
    /// A zero size is treated as one. Storage grows with the addresses
    /// actually pushed, not with the configured size.
    pub fn new(max_batch_size: usize) -> Self {
        Self {
            max_batch_size: max_batch_size.max(1),
            pending: Vec::new(),
            next_sequence: 1,
        }
    }

    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Append an address; hands back a full batch once the size is reached.
    pub fn push(&mut self, address: String) -> Option<Batch> {
        self.pending.push(address);
        if self.pending.len() >= self.max_batch_size {
            let full = std::mem::take(&mut self.pending);
            Some(self.seal(full))
        } else {
            None
        }
    }

    /// Hand back whatever is left once input is exhausted.
    pub fn flush(mut self) -> Option<Batch> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.pending);
        Some(self.seal(rest))
    }

    fn seal(&mut self, addresses: Vec<String>) -> Batch {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        Batch { sequence, addresses }
    }
}
