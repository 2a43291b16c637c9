//! Reward grant events.

use coven_content::domain::quest::Reward;
use coven_core::event::BusEvent;

/// Returns the events announcing `reward` for `quest_id`: the generic grant
/// followed by the kind-specific event, if the kind has one.
///
/// `unlock_quest` has no kind event here; the manager unlocks directly and
/// emits `quest-unlocked`.
#[must_use]
pub fn grant_events(quest_id: &str, reward: &Reward) -> Vec<BusEvent> {
    let granted = BusEvent::QuestRewardGranted {
        quest_id: quest_id.to_owned(),
        reward_type: reward.kind().to_owned(),
        reward_id: reward.target_id().to_owned(),
    };

    let specific = match reward {
        Reward::UnlockQuest { .. } => None,
        Reward::Item { item_id, amount } => Some(BusEvent::RewardItem {
            item_id: item_id.clone(),
            amount: *amount,
        }),
        Reward::Resource {
            resource_id,
            amount,
        } => Some(BusEvent::RewardResource {
            resource_id: resource_id.clone(),
            amount: *amount,
        }),
        Reward::Function { name } => Some(BusEvent::RewardFunction { name: name.clone() }),
        Reward::Cosmetic { cosmetic_id } => Some(BusEvent::RewardCosmetic {
            cosmetic_id: cosmetic_id.clone(),
        }),
    };

    std::iter::once(granted).chain(specific).collect()
}
