use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dao::models::{Gender, JudgeType};

#[derive(Debug, Deserialize, Serialize, ToSchema)]
/// Messages accepted from scoring WebSocket clients.
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScoringInboundMessage {
    /// First message on a connection: join the room of one bucket.
    Join { gender: Gender, age_group: String },
    /// A judge publishing the mark of their slot for one player.
    ScoreUpdate {
        player_id: Uuid,
        player_name: String,
        judge_type: JudgeType,
        score: f64,
    },
    #[serde(other)]
    Unknown,
}

impl ScoringInboundMessage {
    /// Parse a raw text frame into a message.
    pub fn from_json_str(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
/// Messages pushed to scoring WebSocket clients.
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScoringOutboundMessage {
    /// Acknowledgement after a successful room join.
    Joined { room: String },
    /// A judge mark moving through the room.
    ScoreUpdate(ScoreUpdateBroadcast),
    /// A persistent save happened for a team; clients should refresh.
    ScoresSaved(ScoresSavedBroadcast),
    /// A message was rejected; the connection stays usable.
    Rejected { message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
/// Single-slot score event fanned out to every member of a room.
pub struct ScoreUpdateBroadcast {
    /// Room the event belongs to.
    pub room: String,
    pub player_id: Uuid,
    /// Denormalized so receivers can render players missing from their roster.
    pub player_name: String,
    pub judge_type: JudgeType,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
/// Notification that a team's scores were persisted; carries no score payload.
pub struct ScoresSavedBroadcast {
    /// Room the event belongs to.
    pub room: String,
    pub team_id: Uuid,
}

#[derive(Debug, Clone)]
/// Dispatched payload carried across room broadcast channels.
pub enum RoomEvent {
    ScoreUpdate(ScoreUpdateBroadcast),
    ScoresSaved(ScoresSavedBroadcast),
}

impl From<RoomEvent> for ScoringOutboundMessage {
    fn from(event: RoomEvent) -> Self {
        match event {
            RoomEvent::ScoreUpdate(update) => ScoringOutboundMessage::ScoreUpdate(update),
            RoomEvent::ScoresSaved(saved) => ScoringOutboundMessage::ScoresSaved(saved),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_update_round_trips_through_the_wire_tag() {
        let raw = r#"{
            "type": "score_update",
            "player_id": "6f9fcd5e-6b86-4a0b-a7dc-86b8e32a4bfa",
            "player_name": "Ada",
            "judge_type": "judge2",
            "score": 8.5
        }"#;

        match ScoringInboundMessage::from_json_str(raw).unwrap() {
            ScoringInboundMessage::ScoreUpdate {
                player_name,
                judge_type,
                score,
                ..
            } => {
                assert_eq!(player_name, "Ada");
                assert_eq!(judge_type, JudgeType::Judge2);
                assert_eq!(score, 8.5);
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn unrecognized_messages_parse_as_unknown() {
        let message = ScoringInboundMessage::from_json_str(r#"{"type": "ping"}"#).unwrap();
        assert!(matches!(message, ScoringInboundMessage::Unknown));
    }
}
