//! Occurrence data structures.
//!
//! Raw occurrence records arrive from the tracking API with loosely typed
//! fields (numbers and strings are used interchangeably). The normalizer
//! converts them into canonical [`Occurrence`] values keyed by the NF-e
//! access key.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Categorical delivery status, ordered by how final the report is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliveryStatus {
    /// Delivery confirmed by the carrier
    #[serde(rename = "ENTREGUE")]
    Delivered,

    /// Delivery cancelled or blocked
    #[serde(rename = "CANCELADO")]
    Cancelled,

    /// Shipment data confirmed
    #[serde(rename = "DADOS CONFIRMADOS")]
    DataConfirmed,

    /// Recipient contact confirmed
    #[serde(rename = "CONTATOS CONFIRMADOS")]
    ContactConfirmed,
}

impl DeliveryStatus {
    /// Map a tracking API occurrence code to a status.
    ///
    /// Returns `None` for unrecognized codes; the normalizer treats those
    /// records as errors rather than guessing a priority.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "1" | "2" | "37" | "999" => Some(Self::Delivered),
            "25" | "102" | "203" | "303" | "325" | "327" => Some(Self::Cancelled),
            "200" | "201" | "202" => Some(Self::DataConfirmed),
            "7" | "206" => Some(Self::ContactConfirmed),
            _ => None,
        }
    }

    /// All occurrence codes the tracking API is queried for.
    pub fn known_codes() -> &'static [&'static str] {
        &[
            "1", "2", "37", "999", "25", "102", "203", "303", "325", "327", "200", "201", "202",
            "7", "206",
        ]
    }

    /// Total-order rank; higher means more final/authoritative.
    pub fn priority(self) -> u8 {
        match self {
            Self::Delivered => 3,
            Self::Cancelled => 2,
            Self::DataConfirmed => 1,
            Self::ContactConfirmed => 0,
        }
    }

    /// Label used in the published snapshot.
    pub fn as_label(self) -> &'static str {
        match self {
            Self::Delivered => "ENTREGUE",
            Self::Cancelled => "CANCELADO",
            Self::DataConfirmed => "DADOS CONFIRMADOS",
            Self::ContactConfirmed => "CONTATOS CONFIRMADOS",
        }
    }
}

/// One canonical delivery-tracking event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occurrence {
    /// NF-e access key; stable identity of the delivery
    pub key: String,

    /// Delivery status reported by this event
    pub status: DeliveryStatus,

    /// Timestamp the event was recorded at the source
    pub occurred_at: DateTime<Utc>,

    /// Carrier name (source-reported, rewritten by the mapping applier)
    pub carrier: String,

    /// Invoice number
    pub invoice: String,

    /// Invoice series
    pub series: String,

    /// Order number
    pub order: String,
}

impl Occurrence {
    /// Whether this occurrence carries better evidence than `other`.
    ///
    /// Strictly higher priority wins; on equal priority the later
    /// occurrence date wins. Everything else loses, so repeated
    /// application is stable.
    pub fn supersedes(&self, other: &Occurrence) -> bool {
        self.status.priority() > other.status.priority()
            || (self.status.priority() == other.status.priority()
                && self.occurred_at > other.occurred_at)
    }
}

/// A raw occurrence record as returned by the tracking API.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawOccurrence {
    /// Occurrence timestamp
    pub data: Value,

    /// Occurrence type (carries the status code)
    #[serde(rename = "tipoOcorrencia")]
    pub occurrence_type: RawOccurrenceType,

    /// Shipment the occurrence refers to
    #[serde(rename = "embarque")]
    pub shipment: RawShipment,
}

/// Occurrence type block of a raw record.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawOccurrenceType {
    /// Status code; the API returns this as a number or a string
    pub codigo: Value,
}

/// Shipment block of a raw record.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawShipment {
    /// NF-e access key
    pub chave: Value,

    /// Invoice number
    pub numero: Value,

    /// Invoice series
    pub serie: Value,

    /// Carrier block
    #[serde(rename = "transportadora")]
    pub carrier: RawCarrier,

    /// Order block
    #[serde(rename = "pedido")]
    pub order: RawOrder,
}

/// Carrier block of a raw shipment.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawCarrier {
    /// Carrier name as reported by the source
    pub nome: Value,
}

/// Order block of a raw shipment.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawOrder {
    /// Order number
    pub numero: Value,
}
