//! In-flight request coalescing

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::broadcast;

/// Outcome of joining a flight for a key
#[derive(Debug)]
pub enum Flight<'a, T: Clone> {
    /// First caller for the key; runs the work and publishes the result
    Leader(LeaderGuard<'a, T>),
    /// Later caller; waits for the leader's result
    Follower(broadcast::Receiver<T>),
}

/// Map from key to the channel the current leader will publish on
#[derive(Debug)]
pub struct SingleFlight<T: Clone> {
    in_flight: Mutex<HashMap<String, broadcast::Sender<T>>>,
}

impl<T: Clone> Default for SingleFlight<T> {
    fn default() -> Self {
        Self {
            in_flight: Mutex::new(HashMap::new()),
        }
    }
}

impl<T: Clone> SingleFlight<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn join(&self, key: impl Into<String>) -> Flight<'_, T> {
        let key = key.into();
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(sender) = in_flight.get(&key) {
            return Flight::Follower(sender.subscribe());
        }

        let (sender, _) = broadcast::channel(1);
        in_flight.insert(key.clone(), sender.clone());

        Flight::Leader(LeaderGuard {
            flight: self,
            key,
            sender: Some(sender),
        })
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().map(|m| m.len()).unwrap_or(0)
    }

    fn remove(&self, key: &str) {
        self.in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
    }
}

/// Held by the leader while it works.
///
/// Dropping it without calling [`LeaderGuard::complete`] closes the channel,
/// so followers see `RecvError::Closed` and do the work themselves.
#[derive(Debug)]
pub struct LeaderGuard<'a, T: Clone> {
    flight: &'a SingleFlight<T>,
    key: String,
    sender: Option<broadcast::Sender<T>>,
}

impl<T: Clone> LeaderGuard<'_, T> {
    /// Publish the result to every follower that joined so far
    pub fn complete(mut self, value: T) {
        if let Some(sender) = self.release() {
            let _ = sender.send(value);
        }
    }

    fn release(&mut self) -> Option<broadcast::Sender<T>> {
        let sender = self.sender.take()?;
        self.flight.remove(&self.key);
        Some(sender)
    }
}

impl<T: Clone> Drop for LeaderGuard<'_, T> {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_follower_receives_leader_value() {
        let flight = SingleFlight::<String>::new();

        let Flight::Leader(leader) = flight.join("k") else {
            panic!("first caller should lead");
        };
        let Flight::Follower(mut follower) = flight.join("k") else {
            panic!("second caller should follow");
        };

        leader.complete("answer".to_string());

        assert_eq!(follower.recv().await.unwrap(), "answer");
        assert_eq!(flight.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_dropped_leader_closes_followers() {
        let flight = SingleFlight::<String>::new();

        let leader = flight.join("k");
        let Flight::Follower(mut follower) = flight.join("k") else {
            panic!("second caller should follow");
        };

        drop(leader);

        assert!(matches!(
            follower.recv().await,
            Err(broadcast::error::RecvError::Closed)
        ));
        assert_eq!(flight.in_flight(), 0);
    }

    #[test]
    fn test_keys_are_independent() {
        let flight = SingleFlight::<u32>::new();

        let a = flight.join("a");
        let b = flight.join("b");

        assert!(matches!(a, Flight::Leader(_)));
        assert!(matches!(b, Flight::Leader(_)));
        assert_eq!(flight.in_flight(), 2);
    }

    #[test]
    fn test_new_leader_after_completion() {
        let flight = SingleFlight::<u32>::new();

        if let Flight::Leader(leader) = flight.join("k") {
            leader.complete(1);
        }

        assert!(matches!(flight.join("k"), Flight::Leader(_)));
    }
}
