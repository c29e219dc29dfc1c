//! Rolling-window rate limiter — per-kind hourly and daily caps.
//!
//! Windows roll continuously (trailing hour, trailing day); nothing resets
//! at midnight. Confirmed actions only: the orchestrator records an event
//! after the executor reports success, never before.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use leadclaw_core::config::LimitsConfig;
use leadclaw_core::types::ActivityKind;

#[derive(Debug, Clone, Copy)]
struct KindCaps {
    per_hour: u32,
    per_day: u32,
}

/// Usage snapshot for one action kind, for status output and cooldown logs.
#[derive(Debug, Clone, serde::Serialize)]
pub struct UsageStats {
    pub kind: ActivityKind,
    pub used_hour: u32,
    pub cap_hour: u32,
    pub used_day: u32,
    pub cap_day: u32,
}

/// Tracks confirmed action timestamps per kind and answers "how many more
/// of this kind may run right now". A cap of 0 disables the kind outright.
pub struct RateLimiter {
    caps: HashMap<ActivityKind, KindCaps>,
    events: HashMap<ActivityKind, Vec<DateTime<Utc>>>,
}

impl RateLimiter {
    pub fn new(config: &LimitsConfig) -> Self {
        let mut caps = HashMap::new();
        caps.insert(
            ActivityKind::Dm,
            KindCaps {
                per_hour: config.dm_per_hour,
                per_day: config.dm_per_day,
            },
        );
        caps.insert(
            ActivityKind::Like,
            KindCaps {
                per_hour: config.like_per_hour,
                per_day: config.like_per_day,
            },
        );
        caps.insert(
            ActivityKind::Repost,
            KindCaps {
                per_hour: config.repost_per_hour,
                per_day: config.repost_per_day,
            },
        );
        caps.insert(
            ActivityKind::Comment,
            KindCaps {
                per_hour: config.comment_per_hour,
                per_day: config.comment_per_day,
            },
        );
        Self {
            caps,
            events: HashMap::new(),
        }
    }

    /// How many more actions of `kind` may run right now.
    pub fn remaining(&mut self, kind: ActivityKind) -> u32 {
        self.remaining_at(kind, Utc::now())
    }

    /// Clock-injected variant of [`remaining`](Self::remaining). The
    /// answer is the tighter of the two windows.
    pub fn remaining_at(&mut self, kind: ActivityKind, now: DateTime<Utc>) -> u32 {
        let caps = match self.caps.get(&kind) {
            Some(c) => *c,
            None => return 0,
        };
        self.purge(kind, now);
        let events = self.events.entry(kind).or_default();
        let hour_ago = now - Duration::hours(1);
        let used_hour = events.iter().filter(|t| **t > hour_ago).count() as u32;
        let used_day = events.len() as u32;
        let left_hour = caps.per_hour.saturating_sub(used_hour);
        let left_day = caps.per_day.saturating_sub(used_day);
        left_hour.min(left_day)
    }

    /// Record one confirmed action of `kind`.
    pub fn record(&mut self, kind: ActivityKind) {
        self.record_at(kind, Utc::now());
    }

    pub fn record_at(&mut self, kind: ActivityKind, at: DateTime<Utc>) {
        self.events.entry(kind).or_default().push(at);
    }

    /// Usage snapshot across all kinds, in rank order.
    pub fn stats_at(&mut self, now: DateTime<Utc>) -> Vec<UsageStats> {
        let mut out = Vec::with_capacity(4);
        for kind in ActivityKind::all() {
            let caps = match self.caps.get(&kind) {
                Some(c) => *c,
                None => continue,
            };
            self.purge(kind, now);
            let events = self.events.entry(kind).or_default();
            let hour_ago = now - Duration::hours(1);
            out.push(UsageStats {
                kind,
                used_hour: events.iter().filter(|t| **t > hour_ago).count() as u32,
                cap_hour: caps.per_hour,
                used_day: events.len() as u32,
                cap_day: caps.per_day,
            });
        }
        out
    }

    /// Drop events that have rolled out of the trailing day.
    fn purge(&mut self, kind: ActivityKind, now: DateTime<Utc>) {
        let day_ago = now - Duration::days(1);
        self.events.entry(kind).or_default().retain(|t| *t > day_ago);
    }
}
