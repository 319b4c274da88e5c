use commonware_cryptography::ed25519::PublicKey;
use futures::{
    channel::{mpsc, oneshot},
    SinkExt,
};
use tenpool_types::EngineError;
use tracing::warn;

use crate::engine::Settlement;

/// Messages sent to the engine actor.
pub enum Message {
    Stake {
        round: u64,
        number: u8,
        amount: u64,
        participant: PublicKey,
        response: oneshot::Sender<Result<(), EngineError>>,
    },
    Close {
        round: u64,
        winning_number: u8,
        response: oneshot::Sender<Result<Settlement, EngineError>>,
    },
    Reserve {
        response: oneshot::Sender<u64>,
    },
    ParticipantCount {
        round: u64,
        response: oneshot::Sender<Result<usize, EngineError>>,
    },
    TotalStaked {
        round: u64,
        response: oneshot::Sender<Result<u64, EngineError>>,
    },
    ParticipantsOn {
        round: u64,
        number: u8,
        response: oneshot::Sender<Result<Vec<PublicKey>, EngineError>>,
    },
    AvailableQuota {
        round: u64,
        response: oneshot::Sender<Result<u64, EngineError>>,
    },
    WinnerMultiplier {
        number: u8,
        response: oneshot::Sender<Result<u64, EngineError>>,
    },
}

/// Mailbox for the engine actor.
///
/// Clone freely; every handle feeds the same single-writer actor, so
/// operations sent from concurrent tasks are applied one at a time.
#[derive(Clone)]
pub struct Mailbox {
    sender: mpsc::Sender<Message>,
}

impl Mailbox {
    pub(crate) fn new(sender: mpsc::Sender<Message>) -> Self {
        Self { sender }
    }

    async fn request<R>(
        &mut self,
        message: Message,
        receiver: oneshot::Receiver<R>,
        label: &'static str,
    ) -> Result<R, EngineError> {
        if self.sender.send(message).await.is_err() {
            warn!(label, "engine mailbox closed; request dropped");
            return Err(EngineError::Unavailable);
        }
        receiver.await.map_err(|_| {
            warn!(label, "engine actor dropped response");
            EngineError::Unavailable
        })
    }

    pub async fn stake(
        &mut self,
        round: u64,
        number: u8,
        amount: u64,
        participant: PublicKey,
    ) -> Result<(), EngineError> {
        let (response, receiver) = oneshot::channel();
        self.request(
            Message::Stake {
                round,
                number,
                amount,
                participant,
                response,
            },
            receiver,
            "stake",
        )
        .await?
    }

    pub async fn close_round(
        &mut self,
        round: u64,
        winning_number: u8,
    ) -> Result<Settlement, EngineError> {
        let (response, receiver) = oneshot::channel();
        self.request(
            Message::Close {
                round,
                winning_number,
                response,
            },
            receiver,
            "close",
        )
        .await?
    }

    pub async fn reserve(&mut self) -> Result<u64, EngineError> {
        let (response, receiver) = oneshot::channel();
        self.request(Message::Reserve { response }, receiver, "reserve")
            .await
    }

    pub async fn participant_count(&mut self, round: u64) -> Result<usize, EngineError> {
        let (response, receiver) = oneshot::channel();
        self.request(
            Message::ParticipantCount { round, response },
            receiver,
            "participant_count",
        )
        .await?
    }

    pub async fn total_staked(&mut self, round: u64) -> Result<u64, EngineError> {
        let (response, receiver) = oneshot::channel();
        self.request(
            Message::TotalStaked { round, response },
            receiver,
            "total_staked",
        )
        .await?
    }

    pub async fn participants_on(
        &mut self,
        round: u64,
        number: u8,
    ) -> Result<Vec<PublicKey>, EngineError> {
        let (response, receiver) = oneshot::channel();
        self.request(
            Message::ParticipantsOn {
                round,
                number,
                response,
            },
            receiver,
            "participants_on",
        )
        .await?
    }

    pub async fn available_quota(&mut self, round: u64) -> Result<u64, EngineError> {
        let (response, receiver) = oneshot::channel();
        self.request(
            Message::AvailableQuota { round, response },
            receiver,
            "available_quota",
        )
        .await?
    }

    pub async fn winner_multiplier(&mut self, number: u8) -> Result<u64, EngineError> {
        let (response, receiver) = oneshot::channel();
        self.request(
            Message::WinnerMultiplier { number, response },
            receiver,
            "winner_multiplier",
        )
        .await?
    }
}
