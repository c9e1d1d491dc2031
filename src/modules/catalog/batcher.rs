//! Paced delivery of multi-row results.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use super::messages;
use super::ports::{ChatId, Messenger};

/// Row separator inside one outbound unit.
const ROW_SEPARATOR: &str = "\n\n";

/// What a delivery sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryReport {
    pub rows: usize,
    /// Data units sent; zero when the "no results" notice was sent instead.
    pub units: usize,
}

/// Splits rows into bounded units and sends them one after another, pausing
/// between units to stay under the chat platform's message rate.
#[derive(Clone)]
pub struct ResultBatcher {
    messenger: Arc<dyn Messenger>,
    pacing: Duration,
    max_unit_chars: usize,
}

impl ResultBatcher {
    /// `max_unit_chars` caps one unit at what the platform accepts as a
    /// single message.
    pub fn new(messenger: Arc<dyn Messenger>, pacing: Duration, max_unit_chars: usize) -> Self {
        Self {
            messenger,
            pacing,
            max_unit_chars,
        }
    }

    /// Send `rows` to `chat` in units of at most `batch_size` formatted rows
    /// and at most `max_unit_chars` characters. The last unit carries the
    /// total row count; an empty input produces a single "no results" notice.
    /// A row longer than the character cap goes out alone.
    pub async fn deliver<R, F>(
        &self,
        chat: ChatId,
        rows: &[R],
        batch_size: NonZeroUsize,
        format: F,
    ) -> DeliveryReport
    where
        F: Fn(&R) -> String,
    {
        if rows.is_empty() {
            self.send(chat, messages::NO_RESULTS).await;
            return DeliveryReport { rows: 0, units: 0 };
        }

        let total = rows.len();
        let trailer = format!("{ROW_SEPARATOR}{}", messages::total_rows(total));
        let budget = self.max_unit_chars.saturating_sub(char_len(&trailer));
        let mut pending = pack(rows.iter().map(&format), batch_size.get(), budget);
        if let Some(last) = pending.last_mut() {
            last.push_str(&trailer);
        }

        let mut units = 0;
        for (index, unit) in pending.iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.pacing).await;
            }
            self.send(chat, unit).await;
            units += 1;
        }

        tracing::debug!(chat, rows = total, units, "result delivered");
        DeliveryReport { rows: total, units }
    }

    async fn send(&self, chat: ChatId, text: &str) {
        if let Err(error) = self.messenger.send(chat, text).await {
            tracing::warn!(chat, %error, "outbound message dropped");
        }
    }
}

/// Greedily groups formatted rows, closing a unit when it holds
/// `max_rows` rows or the next row would push it past `max_chars`.
fn pack(rows: impl Iterator<Item = String>, max_rows: usize, max_chars: usize) -> Vec<String> {
    let separator_len = char_len(ROW_SEPARATOR);
    let mut units = Vec::new();
    let mut current = String::new();
    let mut current_rows = 0;
    let mut current_len = 0;

    for row in rows {
        let row_len = char_len(&row);
        let grown = current_len + separator_len + row_len;
        if current_rows > 0 && (current_rows == max_rows || grown > max_chars) {
            units.push(std::mem::take(&mut current));
            current_rows = 0;
            current_len = 0;
        }
        if current_rows > 0 {
            current.push_str(ROW_SEPARATOR);
            current_len += separator_len;
        }
        current.push_str(&row);
        current_len += row_len;
        current_rows += 1;
    }
    if current_rows > 0 {
        units.push(current);
    }
    units
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}
