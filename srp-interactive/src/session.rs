//! Client protocol engine.
//!
//! A session walks a fixed sequence of states:
//!
//! ```text
//! Init -> HelloSent -> ChallengeReceived -> ResponseSent -> Authenticated
//!      -> { RequestSent -> ResultReceived } x N -> Closed
//! ```
//!
//! There is no way back. Any contract violation moves the session to
//! [`SessionState::Failed`] and the error is returned to the caller; after
//! an authentication failure nothing more is sent.

use crate::config::ClientIdentity;
use crate::wire::{
    AuthResult, ClientHello, ClientResponse, Envelope, MessageType, RangeProofRequest,
    RangeProofResult, ServerChallenge,
};
use crate::{InteractiveError, MessageChannel, Result};
use rand::rngs::OsRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use srp_lib::crypto;
use srp_lib::RangeProofBuilder;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Init,
    HelloSent,
    ChallengeReceived,
    ResponseSent,
    Authenticated,
    RequestSent,
    ResultReceived,
    Closed,
    Failed,
}

/// What to do after the verifier rejects a round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundFailurePolicy {
    /// Run the remaining rounds anyway.
    #[default]
    Continue,
    /// Stop after the first rejected round.
    Abort,
}

#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Upper bound on each wait for a server message. `None` waits forever.
    pub recv_timeout: Option<Duration>,
    pub failure_policy: RoundFailurePolicy,
}

/// Public parameters for a batch of proof rounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofPlan {
    pub min: u32,
    pub max: u32,
    pub bitlen: u32,
    pub rounds: u32,
}

/// Verifier's answer to one round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundOutcome {
    pub request_id: u32,
    pub value: u32,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionReport {
    pub rounds: Vec<RoundOutcome>,
    /// Set when [`RoundFailurePolicy::Abort`] cut the batch short.
    pub aborted: bool,
}

impl SessionReport {
    pub fn accepted(&self) -> usize {
        self.rounds.iter().filter(|r| r.ok).count()
    }

    pub fn rejected(&self) -> usize {
        self.rounds.len() - self.accepted()
    }
}

/// Bytes the server signs in its challenge: `serial_id || nonce`.
pub fn challenge_message(serial_id: &[u8], nonce: &[u8]) -> Vec<u8> {
    [serial_id, nonce].concat()
}

/// One client session over an envelope channel.
pub struct ClientSession<C> {
    channel: C,
    identity: ClientIdentity,
    options: SessionOptions,
    builder: RangeProofBuilder,
    state: SessionState,
    next_request_id: u32,
}

impl<C: MessageChannel> ClientSession<C> {
    pub fn new(channel: C, identity: ClientIdentity, options: SessionOptions) -> Self {
        Self {
            channel,
            identity,
            options,
            builder: RangeProofBuilder::default(),
            state: SessionState::Init,
            next_request_id: 1,
        }
    }

    /// Use a custom proof builder.
    pub fn with_builder(mut self, builder: RangeProofBuilder) -> Self {
        self.builder = builder;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Give back the underlying channel.
    pub fn into_channel(self) -> C {
        self.channel
    }

    fn transition(&mut self, next: SessionState) {
        tracing::debug!(from = ?self.state, to = ?next, "session state");
        self.state = next;
    }

    fn check_state(&self, allowed: &[SessionState], operation: &str) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(InteractiveError::ProtocolSequence(format!(
                "cannot {} in state {:?}",
                operation, self.state
            )))
        }
    }

    /// Record a failure and pass it through.
    fn fail<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            tracing::warn!(state = ?self.state, error = %e, "session failed");
            self.state = SessionState::Failed;
        }
        result
    }

    async fn receive(&mut self, waiting_for: &'static str) -> Result<Envelope> {
        match self.options.recv_timeout {
            Some(limit) => tokio::time::timeout(limit, self.channel.recv())
                .await
                .map_err(|_| InteractiveError::Timeout(waiting_for))?,
            None => self.channel.recv().await,
        }
    }

    /// Run the challenge-response handshake.
    pub async fn authenticate(&mut self) -> Result<()> {
        self.check_state(&[SessionState::Init], "authenticate")?;
        let result = self.handshake().await;
        self.fail(result)
    }

    async fn handshake(&mut self) -> Result<()> {
        let serial_id = self.identity.serial_id.clone();

        let hello = ClientHello {
            sig: crypto::sign(&self.identity.client_key, &serial_id).to_vec(),
            serial_id: serial_id.clone(),
        };
        self.channel
            .send(Envelope::wrap(MessageType::ClientHello, &hello, None))
            .await?;
        self.transition(SessionState::HelloSent);

        let envelope = self.receive("server challenge").await?;
        envelope.expect(MessageType::ServerChallenge)?;
        let challenge: ServerChallenge = envelope.open()?;
        let signed = challenge_message(&serial_id, &challenge.nonce);
        if !crypto::verify(&self.identity.server_key, &signed, &challenge.server_sig) {
            return Err(InteractiveError::Authentication(
                "server challenge signature is invalid".into(),
            ));
        }
        tracing::debug!(nonce = %hex::encode(&challenge.nonce), "server challenge verified");
        self.transition(SessionState::ChallengeReceived);

        let response = ClientResponse {
            sig: crypto::sign(&self.identity.client_key, &challenge.nonce).to_vec(),
        };
        self.channel
            .send(Envelope::wrap(MessageType::ClientResponse, &response, None))
            .await?;
        self.transition(SessionState::ResponseSent);

        let envelope = self.receive("auth result").await?;
        envelope.expect(MessageType::AuthResult)?;
        let auth: AuthResult = envelope.open()?;
        if !auth.ok {
            return Err(InteractiveError::Authentication(
                auth.message
                    .unwrap_or_else(|| "server rejected the client".into()),
            ));
        }
        self.transition(SessionState::Authenticated);
        tracing::info!(
            serial_id = %String::from_utf8_lossy(&serial_id),
            "authenticated"
        );
        Ok(())
    }

    /// Prove one uniformly sampled value from `[plan.min, plan.max]`.
    pub async fn prove_round(&mut self, plan: &ProofPlan) -> Result<RoundOutcome> {
        if plan.min > plan.max {
            // let the builder report it with the usual error
            return self.prove_value(plan, plan.min).await;
        }
        let value = OsRng.gen_range(plan.min..=plan.max);
        self.prove_value(plan, value).await
    }

    /// Prove that `value` lies in `[plan.min, plan.max]` and read the verdict.
    pub async fn prove_value(&mut self, plan: &ProofPlan, value: u32) -> Result<RoundOutcome> {
        self.check_state(
            &[SessionState::Authenticated, SessionState::ResultReceived],
            "send a range proof",
        )?;
        let result = self.exchange_proof(plan, value).await;
        self.fail(result)
    }

    async fn exchange_proof(&mut self, plan: &ProofPlan, value: u32) -> Result<RoundOutcome> {
        let proof = self
            .builder
            .build(plan.min, plan.max, plan.bitlen, value, &mut OsRng)?;
        let request_id = self.next_request_id;

        let request = RangeProofRequest::from(&proof);
        self.channel
            .send(Envelope::wrap(
                MessageType::RangeProofRequest,
                &request,
                Some(request_id),
            ))
            .await?;
        self.next_request_id += 1;
        self.transition(SessionState::RequestSent);

        let envelope = self.receive("range proof result").await?;
        envelope.expect(MessageType::RangeProofResult)?;
        if let Some(echoed) = envelope.request_id {
            if echoed != request_id {
                return Err(InteractiveError::ProtocolSequence(format!(
                    "result for request {} while waiting for {}",
                    echoed, request_id
                )));
            }
        }
        let verdict: RangeProofResult = envelope.open()?;
        self.transition(SessionState::ResultReceived);

        let outcome = RoundOutcome {
            request_id,
            value,
            ok: verdict.ok,
            message: verdict.message,
        };
        if outcome.ok {
            tracing::info!(request_id, "range proof accepted");
        } else {
            tracing::warn!(
                request_id,
                message = outcome.message.as_deref().unwrap_or(""),
                "range proof rejected"
            );
        }
        Ok(outcome)
    }

    /// Stop sending and mark the session closed.
    pub async fn close(&mut self) -> Result<()> {
        if self.state == SessionState::Closed {
            return Ok(());
        }
        let result = self.channel.close().await;
        let result = self.fail(result);
        if result.is_ok() {
            self.transition(SessionState::Closed);
        }
        result
    }

    /// Authenticate, run every round of `plan`, then close.
    pub async fn run(&mut self, plan: &ProofPlan) -> Result<SessionReport> {
        self.authenticate().await?;

        let mut report = SessionReport::default();
        for _ in 0..plan.rounds {
            let outcome = self.prove_round(plan).await?;
            let rejected = !outcome.ok;
            report.rounds.push(outcome);
            if rejected && self.options.failure_policy == RoundFailurePolicy::Abort {
                tracing::info!("stopping after rejected round");
                report.aborted = true;
                break;
            }
        }

        self.close().await?;
        tracing::info!(
            accepted = report.accepted(),
            rejected = report.rejected(),
            "session finished"
        );
        Ok(report)
    }
}
