use crate::state::AppState;
use std::sync::Arc;
use std::time::Duration;

pub const STATS_INTERVAL: Duration = Duration::from_secs(5);

/// Push stats for every active room to stats subscribers once
pub async fn broadcast_room_stats(state: &AppState) -> usize {
    let mut sent = 0;
    for room_id in state.active_room_ids().await {
        match state.get_room_stats(&room_id).await {
            Ok(stats) => {
                // Ignore send errors (no receivers connected is fine)
                let _ = state.stats_broadcast.send(stats);
                sent += 1;
            }
            Err(e) => tracing::warn!(room_id = %room_id, "Skipping room stats: {}", e),
        }
    }
    sent
}

/// Spawn a background task that broadcasts room stats for active rooms
pub fn spawn_room_stats_broadcaster(state: Arc<AppState>) {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(STATS_INTERVAL).await;

            if state.stats_broadcast.receiver_count() == 0 {
                continue;
            }
            broadcast_room_stats(&state).await;
        }
    });
}
