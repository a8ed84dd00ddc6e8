use serde::{Serialize, Serializer};

/// One persisted inference. Immutable once written; the store never rewrites
/// or deletes records. `filename` joins this record to the uploaded audio and
/// visualization artifacts, and may repeat across re-analyses.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryRecord {
    pub timestamp: String,
    pub filename: String,
    pub predicted_emotion: String,
    pub confidence: f64,
    /// At most three entries, descending by probability.
    #[serde(serialize_with = "serialize_top3")]
    pub top_3_probabilities: Vec<(String, f64)>,
}

impl HistoryRecord {
    pub fn new(
        filename: String,
        predicted_emotion: String,
        confidence: f64,
        top_3: Vec<(String, f64)>,
    ) -> Self {
        Self {
            timestamp: chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            filename,
            predicted_emotion,
            confidence,
            top_3_probabilities: top_3,
        }
    }

    /// The persisted form of the top-3 column: an embedded JSON object
    /// string, keys in descending probability order.
    pub fn top3_json(&self) -> String {
        pairs_to_json(&self.top_3_probabilities)
    }

    pub fn parse_top3(json: &str) -> Vec<(String, f64)> {
        let map: serde_json::Map<String, serde_json::Value> =
            serde_json::from_str(json).unwrap_or_default();
        map.into_iter()
            .filter_map(|(label, value)| value.as_f64().map(|p| (label, p)))
            .collect()
    }
}

fn pairs_to_json(pairs: &[(String, f64)]) -> String {
    let mut map = serde_json::Map::new();
    for (label, p) in pairs {
        map.insert(label.clone(), serde_json::json!(p));
    }
    serde_json::Value::Object(map).to_string()
}

/// History rows travel over the wire exactly as persisted: the top-3 column
/// stays an embedded JSON string.
fn serialize_top3<S: Serializer>(pairs: &[(String, f64)], s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&pairs_to_json(pairs))
}
