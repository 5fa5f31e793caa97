// SPDX-FileCopyrightText: 2026 Chronicle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Local usage statistics. Computed for every build, analyzed or not.

use std::collections::HashMap;

use chrono::{FixedOffset, Timelike};
use chronicle_core::{ChatStats, Message, UserActivity};

/// Messages sent before this local hour count as night messages.
const NIGHT_END_HOUR: u32 = 6;

/// Compute statistics for one day's messages, bucketing hours in `offset`.
pub fn compute_stats(messages: &[Message], offset: FixedOffset) -> ChatStats {
    let mut stats = ChatStats::default();
    let mut users: Vec<UserActivity> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for message in messages {
        let characters = message.text.chars().count();
        let media = message.media_refs.len();
        let hour = message
            .sent_at()
            .map(|at| at.with_timezone(&offset).hour());
        let night = hour.is_some_and(|h| h < NIGHT_END_HOUR);

        stats.message_count += 1;
        stats.total_characters += characters as u64;
        stats.media_count += media as u32;
        if let Some(hour) = hour {
            stats.hourly_activity[hour as usize] += 1;
        }
        if night {
            stats.night_message_count += 1;
        }

        let slot = *index.entry(message.user_id.as_str()).or_insert_with(|| {
            users.push(UserActivity {
                user_id: message.user_id.clone(),
                display_name: message.display_name.clone(),
                message_count: 0,
                character_count: 0,
                media_count: 0,
                night_message_count: 0,
            });
            users.len() - 1
        });
        let user = &mut users[slot];
        user.display_name.clone_from(&message.display_name);
        user.message_count += 1;
        user.character_count += characters as u32;
        user.media_count += media as u32;
        if night {
            user.night_message_count += 1;
        }
    }

    // Stable sort keeps first-appearance order among ties.
    users.sort_by(|a, b| b.message_count.cmp(&a.message_count));

    stats.participant_count = users.len() as u32;
    stats.peak_hour = peak_hour(&stats.hourly_activity);
    stats.users = users;
    stats
}

/// Busiest hour, earliest on ties. `None` when there is no activity.
fn peak_hour(hourly: &[u32; 24]) -> Option<u8> {
    let mut best: Option<(u8, u32)> = None;
    for (hour, &count) in hourly.iter().enumerate() {
        if count > 0 && best.is_none_or(|(_, top)| count > top) {
            best = Some((hour as u8, count));
        }
    }
    best.map(|(hour, _)| hour)
}
