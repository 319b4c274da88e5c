use futures::{channel::mpsc, StreamExt};
use tracing::debug;

use crate::engine::Engine;
use crate::ingress::{Mailbox, Message};
use crate::treasury::Treasury;

/// Engine actor.
///
/// Owns the engine and drains its mailbox one message at a time, so
/// mutating operations never interleave and reads observe only completed
/// states.
pub struct Actor<T: Treasury> {
    engine: Engine<T>,
    mailbox: mpsc::Receiver<Message>,
}

impl<T: Treasury> Actor<T> {
    /// Wrap an engine, returning the actor and a mailbox to drive it.
    pub fn new(engine: Engine<T>, mailbox_size: usize) -> (Self, Mailbox) {
        let (sender, mailbox) = mpsc::channel(mailbox_size);
        (Self { engine, mailbox }, Mailbox::new(sender))
    }

    /// Run until every mailbox handle is dropped, then return the engine so
    /// the host can persist its history.
    pub async fn run(mut self) -> Engine<T> {
        while let Some(message) = self.mailbox.next().await {
            match message {
                Message::Stake {
                    round,
                    number,
                    amount,
                    participant,
                    response,
                } => {
                    let result = self.engine.stake(round, number, amount, participant);
                    if let Err(err) = &result {
                        debug!(round, number, amount, %err, "stake rejected");
                    }
                    let _ = response.send(result);
                }
                Message::Close {
                    round,
                    winning_number,
                    response,
                } => {
                    let result = self.engine.close_round(round, winning_number);
                    if let Err(err) = &result {
                        debug!(round, winning_number, %err, "close rejected");
                    }
                    let _ = response.send(result);
                }
                Message::Reserve { response } => {
                    let _ = response.send(self.engine.reserve());
                }
                Message::ParticipantCount { round, response } => {
                    let _ = response.send(self.engine.participant_count(round));
                }
                Message::TotalStaked { round, response } => {
                    let _ = response.send(self.engine.total_staked(round));
                }
                Message::ParticipantsOn {
                    round,
                    number,
                    response,
                } => {
                    let _ = response.send(self.engine.participants_on(round, number));
                }
                Message::AvailableQuota { round, response } => {
                    let _ = response.send(self.engine.available_quota(round));
                }
                Message::WinnerMultiplier { number, response } => {
                    let _ = response.send(self.engine.winner_multiplier(number));
                }
            }
        }
        self.engine
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::treasury::Memory;
    use commonware_cryptography::{
        ed25519::{PrivateKey, PublicKey},
        Signer,
    };
    use tenpool_types::EngineError;

    fn participant(seed: u64) -> PublicKey {
        PrivateKey::from_seed(seed).public_key()
    }

    #[tokio::test]
    async fn test_actor_round_trip() {
        let mut treasury = Memory::new(1_000);
        treasury.credit(&participant(1), 100);
        treasury.credit(&participant(2), 50);
        let (actor, mut mailbox) = Actor::new(Engine::new(treasury), 16);
        let handle = tokio::spawn(actor.run());

        mailbox.stake(0, 3, 100, participant(1)).await.unwrap();
        mailbox.stake(0, 7, 50, participant(2)).await.unwrap();
        assert_eq!(mailbox.reserve().await.unwrap(), 1_150);
        assert_eq!(mailbox.participant_count(0).await.unwrap(), 2);
        assert_eq!(mailbox.total_staked(0).await.unwrap(), 150);
        assert_eq!(
            mailbox.participants_on(0, 3).await.unwrap(),
            vec![participant(1)]
        );

        let settlement = mailbox.close_round(0, 3).await.unwrap();
        assert_eq!(settlement.multiplier, 5);
        assert_eq!(settlement.total_paid, 500);

        // Errors come back typed through the mailbox.
        assert!(matches!(
            mailbox.close_round(0, 3).await,
            Err(EngineError::RoundNotActive { .. })
        ));

        // Dropping the last mailbox stops the actor and yields the engine.
        drop(mailbox);
        let engine = handle.await.unwrap();
        assert_eq!(engine.active_round().index, 1);
        assert_eq!(engine.treasury().balance(&participant(1)), 500);
    }

    #[tokio::test]
    async fn test_concurrent_mailboxes_serialize() {
        let mut treasury = Memory::new(10_000);
        for seed in 0..8u64 {
            treasury.credit(&participant(seed), 100);
        }
        let (actor, mailbox) = Actor::new(Engine::new(treasury), 4);
        let handle = tokio::spawn(actor.run());

        // Stakes race in from separate tasks; the actor applies them one at
        // a time so every admitted stake is consistent.
        let mut tasks = Vec::new();
        for seed in 0..8u64 {
            let mut mailbox = mailbox.clone();
            tasks.push(tokio::spawn(async move {
                mailbox.stake(0, (seed % 10) as u8, 100, participant(seed)).await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let mut mailbox = mailbox;
        assert_eq!(mailbox.participant_count(0).await.unwrap(), 8);
        assert_eq!(mailbox.total_staked(0).await.unwrap(), 800);

        drop(mailbox);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_mailbox_unavailable_after_actor_stops() {
        let (actor, mut mailbox) = Actor::new(Engine::new(Memory::new(0)), 4);
        drop(actor);
        assert!(matches!(
            mailbox.reserve().await,
            Err(EngineError::Unavailable)
        ));
    }
}
