//! Design process entities and the server-owned status pipeline.
//!
//! The status pipeline is advanced exclusively by server-side events; the
//! client only observes it. Everything here is therefore a *classification*
//! of an observed status (may we poll? may we delete? is the generation job
//! finished?), never a transition computation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::EntityId;

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

/// Maximum length of a process title.
pub const MAX_TITLE_LENGTH: usize = 50;

/// Maximum length of the additional free-text comment.
pub const MAX_COMMENT_LENGTH: usize = 500;

// ---------------------------------------------------------------------------
// Status pipeline
// ---------------------------------------------------------------------------

/// A stage of the design process pipeline.
///
/// Serialized in SCREAMING_SNAKE_CASE to match the wire contract. A status
/// value the client does not recognize deserializes as [`Unknown`]
/// (`#[serde(other)]`) so one new server-side stage cannot break parsing of
/// a whole payload.
///
/// [`Unknown`]: DesignProcessStatus::Unknown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DesignProcessStatus {
    IntakeInProgress,
    ReadyForGeneration,
    GenerationRequested,
    Generating,
    VisualReady,
    Generated,
    ClientAccepted,
    SentToReview,
    ApprovedForProduction,
    InProduction,
    Crafted,
    Shipping,
    InDelivery,
    Completed,
    ReturnInProgress,
    /// Any status value this client version does not know about.
    #[serde(other)]
    Unknown,
}

/// Display ordering of the pipeline, from intake to delivery.
///
/// `Generating` shares a slot with `GenerationRequested` in the original
/// timeline and is intentionally absent here.
pub const STATUS_FLOW: &[DesignProcessStatus] = &[
    DesignProcessStatus::IntakeInProgress,
    DesignProcessStatus::ReadyForGeneration,
    DesignProcessStatus::GenerationRequested,
    DesignProcessStatus::VisualReady,
    DesignProcessStatus::Generated,
    DesignProcessStatus::SentToReview,
    DesignProcessStatus::ClientAccepted,
    DesignProcessStatus::ApprovedForProduction,
    DesignProcessStatus::InProduction,
    DesignProcessStatus::Crafted,
    DesignProcessStatus::Shipping,
    DesignProcessStatus::InDelivery,
    DesignProcessStatus::Completed,
    DesignProcessStatus::ReturnInProgress,
];

/// Display tone for a status badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTone {
    Gold,
    Neutral,
    Muted,
}

impl DesignProcessStatus {
    /// Human-readable label shown next to the status badge.
    pub fn label(&self) -> &'static str {
        match self {
            Self::IntakeInProgress => "Design in progress",
            Self::ReadyForGeneration => "Ready to generate",
            Self::GenerationRequested | Self::Generating => "Generating...",
            Self::Generated => "Generated",
            Self::VisualReady => "Preview ready",
            Self::ClientAccepted => "Accepted by client",
            Self::SentToReview => "Sent to review",
            Self::ApprovedForProduction => "Approved for production",
            Self::InProduction => "In production",
            Self::Crafted => "Crafted",
            Self::Shipping => "Shipping",
            Self::InDelivery => "In delivery",
            Self::Completed => "Completed",
            Self::ReturnInProgress => "Return in progress",
            Self::Unknown => "Unknown",
        }
    }

    /// Badge tone for a status.
    pub fn tone(&self) -> StatusTone {
        match self {
            Self::ReadyForGeneration | Self::VisualReady | Self::ApprovedForProduction => {
                StatusTone::Gold
            }
            Self::GenerationRequested | Self::IntakeInProgress => StatusTone::Neutral,
            _ => StatusTone::Muted,
        }
    }

    /// Whether an asynchronous generation job is known (or assumed) to be
    /// running. This is the entry condition for the status poller.
    pub fn is_generation_in_flight(&self) -> bool {
        matches!(self, Self::GenerationRequested | Self::Generating)
    }

    /// Whether the generation job has finished successfully and the full
    /// detail representation (result URLs) should be re-fetched. This is the
    /// poller's exit condition.
    pub fn is_generation_terminal(&self) -> bool {
        matches!(self, Self::Generated | Self::VisualReady)
    }

    /// Statuses during which a list view should keep refreshing: generation
    /// plus the production/delivery stages that advance without user input.
    pub fn should_poll(&self) -> bool {
        matches!(
            self,
            Self::GenerationRequested
                | Self::Generating
                | Self::InProduction
                | Self::Shipping
                | Self::InDelivery
        )
    }

    /// Whether the process may still be deleted by the client. Once the
    /// process leaves this set the UI must not offer deletion.
    pub fn is_deletable(&self) -> bool {
        matches!(
            self,
            Self::IntakeInProgress
                | Self::ReadyForGeneration
                | Self::GenerationRequested
                | Self::VisualReady
                | Self::ClientAccepted
        )
    }

    /// Whether the additional comment is still editable.
    pub fn is_comment_editable(&self) -> bool {
        matches!(
            self,
            Self::IntakeInProgress | Self::ReadyForGeneration | Self::GenerationRequested
        )
    }

    /// Position of this status in [`STATUS_FLOW`], if it appears there.
    pub fn flow_index(&self) -> Option<usize> {
        STATUS_FLOW.iter().position(|s| s == self)
    }
}

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// A single design project, as returned by the list and summary endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignProcess {
    pub id: EntityId,
    pub title: String,
    pub status: DesignProcessStatus,
    /// Optional classification (e.g. "Ring"), immutable once set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r#type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Result locations, set only by the server once generation finishes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visualization_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Opaque handle of the backend generation job, if one was dispatched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_job_id: Option<String>,
}

impl DesignProcess {
    /// Whether either result URL is present.
    pub fn has_preview(&self) -> bool {
        self.visualization_url.is_some() || self.image_url.is_some()
    }

    /// Whether the user may trigger image generation: the process must be
    /// ready and must not already carry a result.
    pub fn can_generate(&self) -> bool {
        self.status == DesignProcessStatus::ReadyForGeneration && !self.has_preview()
    }

    /// Whether the send-to-review action should be offered.
    pub fn can_send_to_review(&self) -> bool {
        self.status != DesignProcessStatus::SentToReview
    }
}

/// Full detail representation: the process plus its free-text comment and
/// accumulated quiz answers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignProcessDetails {
    #[serde(flatten)]
    pub process: DesignProcess,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_comment: Option<String>,
    #[serde(default)]
    pub answers: Vec<crate::quiz::UserAnswer>,
}

impl DesignProcessDetails {
    /// Whether the comment field is currently editable: the status must be
    /// in the editable set and no result may exist yet.
    pub fn comment_editable(&self) -> bool {
        self.process.status.is_comment_editable() && !self.process.has_preview()
    }
}

/// Lightweight shape returned by the status endpoint while a generation job
/// is in flight.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessStatus {
    pub id: EntityId,
    pub status: DesignProcessStatus,
    pub updated_at: DateTime<Utc>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r#type: Option<String>,
}

/// The authenticated user, as returned by the `me` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    pub id: EntityId,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}
