//! Group scheduling polls.
//!
//! An organizer proposes candidate slots, each participant keeps one vote
//! (re-voting replaces it), and results rank slots by how many votes
//! mention them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{Result, ValidationError};
use crate::storage::IntervalStore;

/// Slot ids are 1-based positions within their poll.
pub type SlotId = u32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollSlot {
    pub id: SlotId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulingPoll {
    pub id: String,
    pub organizer_id: String,
    pub title: String,
    pub time_slots: Vec<PollSlot>,
    pub duration_minutes: i64,
    pub created_at: DateTime<Utc>,
}

impl SchedulingPoll {
    pub fn has_slot(&self, slot_id: SlotId) -> bool {
        self.time_slots.iter().any(|s| s.id == slot_id)
    }
}

/// One voter's current preference for a poll. Unique per (poll, voter).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollVote {
    pub poll_id: String,
    pub voter_id: String,
    pub preferred_slots: Vec<SlotId>,
    pub voted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotTally {
    pub slot_id: SlotId,
    pub votes: u32,
}

/// Count how often each slot appears across `votes`.
///
/// Sorted by vote count descending, then slot id ascending. Slots nobody
/// voted for do not appear.
pub fn tally(votes: &[PollVote]) -> Vec<SlotTally> {
    let mut counts: HashMap<SlotId, u32> = HashMap::new();
    for slot_id in votes.iter().flat_map(|v| v.preferred_slots.iter()) {
        *counts.entry(*slot_id).or_insert(0) += 1;
    }

    let mut results: Vec<SlotTally> = counts
        .into_iter()
        .map(|(slot_id, votes)| SlotTally { slot_id, votes })
        .collect();
    results.sort_by(|a, b| b.votes.cmp(&a.votes).then(a.slot_id.cmp(&b.slot_id)));
    results
}

/// Create, vote on and tally scheduling polls.
pub struct PollAggregator;

impl PollAggregator {
    pub fn new() -> Self {
        Self
    }

    /// Persist a new poll. Slots receive ids `1..=n` in the order given.
    ///
    /// # Errors
    /// Rejects an empty title, an empty slot list, an inverted slot range or
    /// a non-positive duration.
    pub fn create_poll<S: IntervalStore + ?Sized>(
        &self,
        store: &S,
        organizer_id: &str,
        title: &str,
        time_slots: &[(DateTime<Utc>, DateTime<Utc>)],
        duration_minutes: i64,
        now: DateTime<Utc>,
    ) -> Result<SchedulingPoll> {
        if title.trim().is_empty() {
            return Err(ValidationError::invalid("title", "must not be empty").into());
        }
        if time_slots.is_empty() {
            return Err(ValidationError::EmptyCollection("time_slots".to_string()).into());
        }
        if duration_minutes <= 0 {
            return Err(ValidationError::invalid("duration_minutes", "must be positive").into());
        }

        let mut slots = Vec::with_capacity(time_slots.len());
        for (index, &(start, end)) in time_slots.iter().enumerate() {
            if end < start {
                return Err(ValidationError::InvalidTimeRange { start, end }.into());
            }
            slots.push(PollSlot {
                id: index as SlotId + 1,
                start_time: start,
                end_time: end,
            });
        }

        let poll = SchedulingPoll {
            id: uuid::Uuid::new_v4().to_string(),
            organizer_id: organizer_id.to_string(),
            title: title.trim().to_string(),
            time_slots: slots,
            duration_minutes,
            created_at: now,
        };
        store.insert_poll(&poll)?;

        tracing::info!(poll_id = %poll.id, organizer_id, slots = poll.time_slots.len(), "created poll");
        Ok(poll)
    }

    /// Record `voter_id`'s preference, replacing any earlier vote.
    ///
    /// Repeated slot ids within one vote are collapsed.
    ///
    /// # Errors
    /// Returns a validation error if the poll does not exist or a slot id is
    /// not part of it.
    pub fn vote<S: IntervalStore + ?Sized>(
        &self,
        store: &S,
        poll_id: &str,
        voter_id: &str,
        preferred_slots: &[SlotId],
        now: DateTime<Utc>,
    ) -> Result<PollVote> {
        let poll = store
            .poll(poll_id)?
            .ok_or_else(|| ValidationError::invalid("poll_id", format!("unknown poll '{poll_id}'")))?;

        let mut slots: Vec<SlotId> = Vec::with_capacity(preferred_slots.len());
        for &slot_id in preferred_slots {
            if !poll.has_slot(slot_id) {
                return Err(ValidationError::invalid(
                    "preferred_slots",
                    format!("slot {slot_id} is not part of poll '{poll_id}'"),
                )
                .into());
            }
            if !slots.contains(&slot_id) {
                slots.push(slot_id);
            }
        }

        let vote = PollVote {
            poll_id: poll_id.to_string(),
            voter_id: voter_id.to_string(),
            preferred_slots: slots,
            voted_at: now,
        };
        store.upsert_vote(&vote)?;

        tracing::debug!(poll_id, voter_id, slots = vote.preferred_slots.len(), "recorded vote");
        Ok(vote)
    }

    /// Ranked slot tallies. An unknown poll has no votes and yields an empty list.
    pub fn get_results<S: IntervalStore + ?Sized>(&self, store: &S, poll_id: &str) -> Result<Vec<SlotTally>> {
        let votes = store.votes(poll_id)?;
        Ok(tally(&votes))
    }
}

impl Default for PollAggregator {
    fn default() -> Self {
        Self::new()
    }
}
