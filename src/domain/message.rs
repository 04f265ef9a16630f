use serde::{Deserialize, Serialize};

use super::types::ClassificationResult;

/// Messages exchanged with the page side, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PageMessage {
    UrlsCaptured { urls: Vec<String> },
    SemanticResults { results: Vec<ClassificationResult> },
    GetLatestResults,
}

/// Control requests from the settings surface, tagged by `action`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ControlMessage {
    UpdateRules,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IncomingMessage {
    Page(PageMessage),
    Control(ControlMessage),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OutgoingMessage {
    Page(PageMessage),
    Ack { success: bool },
    LatestResults { results: Vec<ClassificationResult> },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Label;

    #[test]
    fn parses_wire_messages() {
        let captured: IncomingMessage =
            serde_json::from_str(r#"{"type":"urlsCaptured","urls":["https://a.example/"]}"#)
                .unwrap();
        assert_eq!(
            captured,
            IncomingMessage::Page(PageMessage::UrlsCaptured {
                urls: vec!["https://a.example/".to_string()]
            })
        );

        let update: IncomingMessage = serde_json::from_str(r#"{"action":"updateRules"}"#).unwrap();
        assert_eq!(update, IncomingMessage::Control(ControlMessage::UpdateRules));

        let latest: IncomingMessage =
            serde_json::from_str(r#"{"type":"getLatestResults"}"#).unwrap();
        assert_eq!(latest, IncomingMessage::Page(PageMessage::GetLatestResults));
    }

    #[test]
    fn serializes_results_and_ack() {
        let results = OutgoingMessage::Page(PageMessage::SemanticResults {
            results: vec![ClassificationResult {
                url: "https://a.example/".to_string(),
                label: Label::Wrong,
                snippet: "x".to_string(),
            }],
        });
        assert_eq!(
            serde_json::to_string(&results).unwrap(),
            r#"{"type":"semanticResults","results":[{"url":"https://a.example/","label":"Wrong","snippet":"x"}]}"#
        );
        assert_eq!(
            serde_json::to_string(&OutgoingMessage::Ack { success: true }).unwrap(),
            r#"{"success":true}"#
        );
    }
}
