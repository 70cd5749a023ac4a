//! Camera/microphone acquisition
//!
//! A battle goes Live only after a stream has been acquired for every
//! participant role. Acquisition is the one suspending step of the lifecycle.

use crate::error::ResourceError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Which side of the battle a stream belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantRole {
    Host,
    Guest,
}

/// What to capture for one participant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaConstraints {
    pub participant_id: String,
    pub role: ParticipantRole,
    pub video: bool,
    pub audio: bool,
}

impl MediaConstraints {
    /// Camera plus microphone
    pub fn audio_video(participant_id: &str, role: ParticipantRole) -> Self {
        Self {
            participant_id: participant_id.to_string(),
            role,
            video: true,
            audio: true,
        }
    }
}

/// Handle to an acquired capture stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaStream {
    pub id: Uuid,
    pub participant_id: String,
    pub role: ParticipantRole,
}

#[async_trait]
pub trait MediaCaptureService: Send + Sync {
    /// Acquire a stream matching `constraints`
    async fn acquire(
        &self,
        constraints: &MediaConstraints,
    ) -> std::result::Result<MediaStream, ResourceError>;

    /// Release a stream previously returned by `acquire`
    async fn release(&self, stream: &MediaStream);
}

#[derive(Debug, Default)]
struct CaptureState {
    /// Failures returned (front first) before acquisitions succeed again
    scripted: HashMap<String, VecDeque<ResourceError>>,
    active: HashMap<Uuid, MediaStream>,
}

/// Capture service that always has a device unless told otherwise
#[derive(Debug, Default)]
pub struct InMemoryMediaCapture {
    state: Mutex<CaptureState>,
    latency: Duration,
}

impl InMemoryMediaCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulated time each acquisition takes
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Make the next acquisition for `participant_id` fail with `error`
    pub async fn fail_next(&self, participant_id: &str, error: ResourceError) {
        self.state
            .lock()
            .await
            .scripted
            .entry(participant_id.to_string())
            .or_default()
            .push_back(error);
    }

    /// Number of streams acquired and not yet released
    pub async fn active_streams(&self) -> usize {
        self.state.lock().await.active.len()
    }
}

#[async_trait]
impl MediaCaptureService for InMemoryMediaCapture {
    async fn acquire(
        &self,
        constraints: &MediaConstraints,
    ) -> std::result::Result<MediaStream, ResourceError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let mut state = self.state.lock().await;
        if let Some(error) = state
            .scripted
            .get_mut(&constraints.participant_id)
            .and_then(VecDeque::pop_front)
        {
            return Err(error);
        }

        let stream = MediaStream {
            id: Uuid::new_v4(),
            participant_id: constraints.participant_id.clone(),
            role: constraints.role,
        };
        state.active.insert(stream.id, stream.clone());
        Ok(stream)
    }

    async fn release(&self, stream: &MediaStream) {
        self.state.lock().await.active.remove(&stream.id);
    }
}
