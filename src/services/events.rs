//! Broadcast helpers publishing room events onto the live score channel.

use uuid::Uuid;

use crate::{
    dao::models::Category,
    dto::ws::{RoomEvent, ScoreUpdateBroadcast, ScoresSavedBroadcast},
    state::SharedState,
};

/// Fan a judge's score event out to every subscriber of its room.
pub fn broadcast_score_update(state: &SharedState, update: ScoreUpdateBroadcast) {
    let room = update.room.clone();
    state.rooms().publish(&room, RoomEvent::ScoreUpdate(update));
}

/// Notify a bucket that a team's scores were persisted.
///
/// Carries no score payload; receivers refresh from the store.
pub fn broadcast_scores_saved(state: &SharedState, category: &Category, team_id: Uuid) {
    let room = category.room_id();
    state.rooms().publish(
        &room,
        RoomEvent::ScoresSaved(ScoresSavedBroadcast {
            room: room.clone(),
            team_id,
        }),
    );
}
