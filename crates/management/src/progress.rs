//! Send progress, recomputed from the batch ledger on every read.

use crate::models::{CampaignBatch, Progress};

/// Sum a campaign's batches. `queued` is the backlog reported by the most
/// recent batch, since each batch reports the engine's remaining queue rather
/// than a delta.
pub fn aggregate(batches: &[CampaignBatch]) -> Progress {
    let mut progress = batches.iter().fold(Progress::default(), |mut acc, b| {
        acc.sent += b.sent;
        acc.failed += b.failed;
        acc.skipped += b.skipped;
        acc
    });
    progress.queued = batches
        .iter()
        .max_by_key(|b| b.created_at)
        .map_or(0, |b| b.queued);
    progress.total = progress.sent + progress.failed + progress.skipped + progress.queued;
    progress
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    fn batch(sent: u64, failed: u64, skipped: u64, queued: u64, age_mins: i64) -> CampaignBatch {
        CampaignBatch {
            id: Uuid::new_v4(),
            campaign_id: Uuid::nil(),
            sent,
            failed,
            skipped,
            queued,
            triggered_by: "ops@acme.io".into(),
            created_at: Utc::now() - Duration::minutes(age_mins),
        }
    }

    #[test]
    fn sums_batch_counts() {
        let progress = aggregate(&[batch(10, 2, 1, 0, 10), batch(5, 0, 0, 0, 5)]);
        assert_eq!(progress.sent, 15);
        assert_eq!(progress.failed, 2);
        assert_eq!(progress.skipped, 1);
        assert_eq!(progress.total, 18);
    }

    #[test]
    fn queued_comes_from_latest_batch() {
        // Ledger order does not matter; recency does.
        let progress = aggregate(&[batch(5, 0, 0, 40, 1), batch(10, 0, 0, 90, 30)]);
        assert_eq!(progress.queued, 40);
        assert_eq!(progress.total, 55);
    }

    #[test]
    fn empty_ledger_is_zero() {
        assert_eq!(aggregate(&[]), Progress::default());
    }
}
