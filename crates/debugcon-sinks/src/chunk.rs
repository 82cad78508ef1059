/// Historical per-frame ceiling of the chunked header transport
pub const DEFAULT_CHUNK_SIZE: usize = 5000;

/// Split an encoded payload into pieces of at most `chunk_size` bytes.
///
/// Splits happen on the encoded string, backed off to a UTF-8 character
/// boundary so every piece remains a valid string. Concatenating the pieces
/// reproduces the payload byte for byte.
pub fn chunk_payload(payload: &str, chunk_size: usize) -> Vec<&str> {
    assert!(chunk_size > 3, "chunk_size must exceed UTF-8 width");
    let mut chunks = Vec::new();
    let mut rest = payload;
    while rest.len() > chunk_size {
        let mut cut = chunk_size;
        while !rest.is_char_boundary(cut) {
            cut -= 1;
        }
        let (head, tail) = rest.split_at(cut);
        chunks.push(head);
        rest = tail;
    }
    chunks.push(rest);
    chunks
}

/// Outcome of consuming one message against a hard cap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetStatus {
    /// Under the cap; emit normally
    Ok,
    /// This consume crossed the cap; emit the single "limit reached"
    /// warning and nothing else
    JustExhausted,
    /// Cap already reported; emit nothing
    Exhausted,
}

/// Global message counter with a hard cap.
///
/// Once the cap is crossed, all further output is replaced by a single
/// warning rather than a stream of truncated chunks.
#[derive(Debug, Clone)]
pub struct MessageBudget {
    count: u64,
    cap: u64,
    reported: bool,
}

impl MessageBudget {
    pub fn new(cap: u64) -> Self {
        Self {
            count: 0,
            cap,
            reported: false,
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn consume(&mut self) -> BudgetStatus {
        if self.count >= self.cap {
            if self.reported {
                return BudgetStatus::Exhausted;
            }
            self.reported = true;
            return BudgetStatus::JustExhausted;
        }
        self.count += 1;
        BudgetStatus::Ok
    }
}
