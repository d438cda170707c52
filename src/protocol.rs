//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::domain::{
    AIGeneratedActivity, AIGenerationRequest, AnalysisOutcome, GenerationOutcome, QualityAnalysis, Source,
    VariationType,
};

fn default_variation_count() -> usize {
    3
}

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    Status,
    Generate {
        request: AIGenerationRequest,
    },
    GenerateBulk {
        request: AIGenerationRequest,
        count: usize,
        #[serde(rename = "variationType")]
        variation_type: VariationType,
    },
    GenerateVariations {
        activity: AIGeneratedActivity,
        #[serde(default = "default_variation_count")]
        count: usize,
    },
    Analyze {
        activity: AIGeneratedActivity,
    },
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Status {
        available: bool,
    },
    Activity {
        source: Source,
        activity: AIGeneratedActivity,
    },
    Bulk {
        requested: usize,
        activities: Vec<GenerationOutcome>,
    },
    Variations {
        variations: Vec<AIGeneratedActivity>,
    },
    Analysis {
        source: Source,
        analysis: QualityAnalysis,
    },
    Error {
        message: String,
    },
}

impl From<GenerationOutcome> for ServerWsMessage {
    fn from(o: GenerationOutcome) -> Self {
        ServerWsMessage::Activity { source: o.source, activity: o.activity }
    }
}

impl From<AnalysisOutcome> for ServerWsMessage {
    fn from(o: AnalysisOutcome) -> Self {
        ServerWsMessage::Analysis { source: o.source, analysis: o.analysis }
    }
}

//
// HTTP request/response DTOs
//

#[derive(Debug, Deserialize)]
pub struct BulkIn {
    pub request: AIGenerationRequest,
    pub count: usize,
    #[serde(rename = "variationType")]
    pub variation_type: VariationType,
}
#[derive(Serialize)]
pub struct BulkOut {
    pub requested: usize,
    pub activities: Vec<GenerationOutcome>,
}

#[derive(Debug, Deserialize)]
pub struct VariationsIn {
    pub activity: AIGeneratedActivity,
    #[serde(default = "default_variation_count")]
    pub count: usize,
}
#[derive(Serialize)]
pub struct VariationsOut {
    pub variations: Vec<AIGeneratedActivity>,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeIn {
    pub activity: AIGeneratedActivity,
}

#[derive(Serialize)]
pub struct StatusOut {
    /// Result of the live connectivity probe.
    pub available: bool,
    /// An API key is configured (says nothing about reachability).
    pub configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

#[derive(Serialize)]
pub struct ErrorOut {
    pub error: String,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}
