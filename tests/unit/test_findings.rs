use aegis_client::findings::{cvss_version, select_cvss, validate, CvssVersion};
use aegis_client::ValidationError;
use serde_json::json;

const V2: &str = "AV:N/AC:M/Au:N/C:P/I:N/A:N";
const V30: &str = "CVSS:3.0/AV:N/AC:H/PR:N/UI:R/S:U/C:H/I:L/A:N";
const V31: &str = "CVSS:3.1/AV:N/AC:L/PR:N/UI:N/S:C/C:H/I:H/A:H";

#[test]
fn versions_are_detected_and_ordered() {
    assert_eq!(cvss_version(V2), Some(CvssVersion::V2_0));
    assert_eq!(cvss_version(V30), Some(CvssVersion::V3_0));
    assert_eq!(cvss_version(V31), Some(CvssVersion::V3_1));
    assert!(CvssVersion::V3_1 > CvssVersion::V3_0);
    assert!(CvssVersion::V3_0 > CvssVersion::V2_0);
}

#[test]
fn highest_version_wins_regardless_of_order() {
    let vectors: Vec<String> = [V31, V2, V30].iter().map(|s| s.to_string()).collect();
    assert_eq!(select_cvss(&vectors), Some(V31));

    let vectors: Vec<String> = [V2, V30].iter().map(|s| s.to_string()).collect();
    assert_eq!(select_cvss(&vectors), Some(V30));

    let vectors: Vec<String> = [V2].iter().map(|s| s.to_string()).collect();
    assert_eq!(select_cvss(&vectors), Some(V2));
}

#[test]
fn complete_document_passes() {
    let doc = json!({
        "findings": [
            {
                "application": "OpenSSL",
                "port": 443,
                "cvss": [V2, V31],
                "host_id": "i-0123456789abcdef0",
                "name": "Heartbleed-like",
                "description": "Memory disclosure in TLS heartbeat",
                "cve": "CVE-2014-0160",
                "cwe": "CWE-126",
                "exploit": "public"
            },
            {
                "application": "nginx",
                "port": 80,
                "cvss": [V30],
                "host_tags": {"role": "frontend"}
            }
        ]
    });
    let findings = validate(&doc).unwrap();
    assert_eq!(findings.findings.len(), 2);
    assert_eq!(findings.findings[0].effective_cvss(), Some(V31));
    assert_eq!(findings.findings[1].effective_cvss(), Some(V30));
}

#[test]
fn each_selector_alternative_is_sufficient() {
    for selector in [
        json!({"host_id": "i-1"}),
        json!({"host_ip": "10.0.0.1"}),
        json!({"image_id": "ami-1"}),
        json!({"host_tags": {"env": "prod"}}),
    ] {
        let mut finding = json!({
            "application": "app",
            "port": 22,
            "cvss": [V31]
        });
        for (key, value) in selector.as_object().unwrap() {
            finding[key.as_str()] = value.clone();
        }
        let doc = json!({"findings": [finding]});
        assert!(validate(&doc).is_ok(), "selector {selector} should suffice");
    }
}

#[test]
fn missing_selector_is_rejected_with_index() {
    let doc = json!({
        "findings": [
            {"application": "ok", "port": 1, "cvss": [V31], "host_id": "i-1"},
            {"application": "bad", "port": 2, "cvss": [V31]}
        ]
    });
    let err = validate(&doc).unwrap_err();
    assert!(matches!(err, ValidationError::Finding { index: 1, .. }));
}

#[test]
fn malformed_vectors_are_rejected() {
    for vector in ["", "CVSS:3.2/AV:N", "AV:X/AC:L", "hello world"] {
        let doc = json!({
            "findings": [{
                "application": "app",
                "port": 1,
                "cvss": [vector],
                "host_id": "i-1"
            }]
        });
        assert!(validate(&doc).is_err(), "vector '{vector}' should be rejected");
    }
}

#[test]
fn structurally_invalid_documents_are_rejected() {
    assert!(validate(&json!({})).is_err());
    assert!(validate(&json!({"findings": [{"port": 1}]})).is_err());
    // Port out of u16 range.
    assert!(validate(&json!({
        "findings": [{"application": "a", "port": 123456, "cvss": [V31], "host_id": "i"}]
    }))
    .is_err());
}
