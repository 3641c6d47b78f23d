use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::dto::ws::RoomEvent;

/// Room-scoped publish/subscribe hub for the live score channel.
///
/// Rooms are created lazily on first subscription and removed once the last
/// subscriber is gone. Delivery is best-effort: events published to a room
/// nobody listens to are dropped, and a lagging subscriber skips what it
/// missed instead of stalling the channel.
pub struct RoomHub {
    rooms: DashMap<String, broadcast::Sender<RoomEvent>>,
    capacity: usize,
}

impl RoomHub {
    /// Construct a hub whose per-room channels hold `capacity` events.
    pub fn new(capacity: usize) -> Self {
        Self {
            rooms: DashMap::new(),
            capacity,
        }
    }

    /// Join a room, creating its channel on first use.
    pub fn subscribe(&self, room_id: &str) -> broadcast::Receiver<RoomEvent> {
        self.rooms
            .entry(room_id.to_owned())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Fan an event out to every current subscriber of a room.
    pub fn publish(&self, room_id: &str, event: RoomEvent) {
        let Some(sender) = self.rooms.get(room_id).map(|entry| entry.value().clone()) else {
            return;
        };

        if sender.send(event).is_err() {
            // Last subscriber left; forget the empty room.
            self.rooms
                .remove_if(room_id, |_, sender| sender.receiver_count() == 0);
        }
    }

    /// Number of live subscribers in a room.
    pub fn subscriber_count(&self, room_id: &str) -> usize {
        self.rooms
            .get(room_id)
            .map(|entry| entry.value().receiver_count())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::dto::ws::ScoresSavedBroadcast;

    fn saved_event(room: &str) -> RoomEvent {
        RoomEvent::ScoresSaved(ScoresSavedBroadcast {
            room: room.to_owned(),
            team_id: Uuid::new_v4(),
        })
    }

    #[tokio::test]
    async fn events_reach_room_subscribers() {
        let hub = RoomHub::new(8);
        let mut receiver = hub.subscribe("scoring_male_u12");

        hub.publish("scoring_male_u12", saved_event("scoring_male_u12"));

        let event = receiver.recv().await.unwrap();
        assert!(matches!(event, RoomEvent::ScoresSaved(_)));
    }

    #[tokio::test]
    async fn rooms_are_isolated_from_each_other() {
        let hub = RoomHub::new(8);
        let mut u12 = hub.subscribe("scoring_male_u12");
        let mut u15 = hub.subscribe("scoring_male_u15");

        hub.publish("scoring_male_u15", saved_event("scoring_male_u15"));

        assert!(u15.recv().await.is_ok());
        assert!(u12.try_recv().is_err());
    }

    #[tokio::test]
    async fn publishing_to_an_empty_room_is_a_quiet_no_op() {
        let hub = RoomHub::new(8);
        hub.publish("scoring_female_open", saved_event("scoring_female_open"));
        assert_eq!(hub.subscriber_count("scoring_female_open"), 0);
    }
}
