//! Unsigned local receipts, the informational predecessor format.
//!
//! Before warrants, runs carried a plain "receipt" object with no
//! cryptography and no binding: shape checks only. The format survives as a
//! fallback for local runs where no issuer is available. A receipt proves
//! nothing; never feed its outcome into the policy gate in strict mode.

use serde::Serialize;
use serde_json::Value;

/// Outcome of a receipt shape check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReceiptDecision {
    pub ok: bool,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verifier: Option<String>,
}

impl ReceiptDecision {
    fn deny(reason: &str) -> Self {
        Self {
            ok: false,
            reason: reason.to_string(),
            issuer: None,
            verifier: None,
        }
    }
}

/// Shape-check a local receipt. No crypto, no network, no binding.
pub fn verify_receipt(receipt: &Value) -> ReceiptDecision {
    let Some(obj) = receipt.as_object() else {
        return ReceiptDecision::deny("receipt_not_object");
    };

    let issuer = obj.get("issuer").and_then(Value::as_str);
    if issuer.is_none() {
        return ReceiptDecision::deny("missing_issuer");
    }
    if obj.get("issued_at").is_none() {
        return ReceiptDecision::deny("missing_issued_at");
    }
    // Absent means verified: the field exists so a producer can mark a
    // receipt it already knows is stale.
    let verified = obj.get("verified").and_then(Value::as_bool).unwrap_or(true);
    if !verified {
        return ReceiptDecision::deny("receipt_not_verified");
    }

    ReceiptDecision {
        ok: true,
        reason: "ok".to_string(),
        issuer: issuer.map(str::to_string),
        verifier: Some(
            obj.get("verifier")
                .and_then(Value::as_str)
                .unwrap_or("local-receipt")
                .to_string(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_well_formed_receipt_accepted() {
        let decision = verify_receipt(&json!({
            "issuer": "local",
            "issued_at": "2026-08-06T00:00:00Z"
        }));
        assert!(decision.ok);
        assert_eq!(decision.issuer.as_deref(), Some("local"));
        assert_eq!(decision.verifier.as_deref(), Some("local-receipt"));
    }

    #[test]
    fn test_shape_failures() {
        assert_eq!(verify_receipt(&json!("text")).reason, "receipt_not_object");
        assert_eq!(
            verify_receipt(&json!({"issued_at": "x"})).reason,
            "missing_issuer"
        );
        assert_eq!(
            verify_receipt(&json!({"issuer": "local"})).reason,
            "missing_issued_at"
        );
        assert_eq!(
            verify_receipt(&json!({
                "issuer": "local",
                "issued_at": "x",
                "verified": false
            }))
            .reason,
            "receipt_not_verified"
        );
    }
}
