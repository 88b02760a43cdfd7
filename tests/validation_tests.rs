use cardguard::rules::FieldRuleDescriptor;
use cardguard::scanner::SecurityViolationKind;
use cardguard::validation::{ErrorKind, FieldValue, InputValidator, ValidateOptions};
use serde_json::json;

fn validate(validator: &InputValidator, field: &str, value: &str) -> cardguard::ValidationResult {
    validator.validate_field(field, &FieldValue::from(value), ValidateOptions::default())
}

#[test]
fn test_valid_fields() {
    let validator = InputValidator::new();

    let result = validate(&validator, "employeeId", "EMP001");
    assert!(result.valid);
    assert_eq!(result.sanitized_value.as_deref(), Some("EMP001"));

    assert!(validate(&validator, "employeeName", "山田 太郎").valid);
    assert!(validate(&validator, "email", "taro.yamada@example.co.jp").valid);
    assert!(validate(&validator, "phoneNumber", "090-1234-5678").valid);
    assert!(validate(&validator, "lostTime", "08:45").valid);
    assert!(validate(&validator, "lostDate", "2024-03-15").valid);
    assert!(validate(&validator, "lostLocation", "新宿駅 東口改札付近").valid);
    assert!(validate(&validator, "cardType", "SUICA").valid);
}

#[test]
fn test_unknown_field() {
    let validator = InputValidator::new();
    let result = validate(&validator, "favouriteColour", "blue");
    assert!(!result.valid);
    assert_eq!(result.error_kind(), Some(ErrorKind::UnknownField));
    assert!(result.sanitized_value.is_none());
}

#[test]
fn test_absent_values() {
    let validator = InputValidator::new();

    let result = validator.validate_field("employeeName", &FieldValue::Absent, ValidateOptions::default());
    assert_eq!(result.error_kind(), Some(ErrorKind::RequiredField));

    let result = validator.validate_field(
        "employeeName",
        &FieldValue::Absent,
        ValidateOptions { allow_empty: true },
    );
    assert!(result.valid);
    assert_eq!(result.sanitized_value.as_deref(), Some(""));

    // Optional fields accept absence without the option
    let result = validator.validate_field("department", &FieldValue::Absent, ValidateOptions::default());
    assert!(result.valid);
    assert_eq!(result.sanitized_value.as_deref(), Some(""));
}

#[test]
fn test_blank_required_value() {
    let validator = InputValidator::new();
    let result = validate(&validator, "lostLocation", "   ");
    assert_eq!(result.error_kind(), Some(ErrorKind::RequiredField));

    let result = validate(&validator, "department", "   ");
    assert!(result.valid);
    assert_eq!(result.sanitized_value.as_deref(), Some(""));
}

#[test]
fn test_excessive_length_reports_true_length() {
    let validator = InputValidator::new();

    for name in validator.registry().rule_names() {
        let rule = validator.get_rule(&name).unwrap();
        let value = "7".repeat(rule.max_length + 3);
        let result = validate(&validator, &name, &value);
        let error = result.error.expect("overlong value must fail");
        assert_eq!(error.kind, ErrorKind::ExcessiveLength, "field {}", name);
        assert_eq!(error.actual_length, Some(rule.max_length + 3));
        assert_eq!(error.max_length, Some(rule.max_length));
    }
}

#[test]
fn test_length_counts_characters_not_bytes() {
    let validator = InputValidator::new();
    // 50 kanji is exactly at the limit even though it is 150 bytes
    let name = "山".repeat(50);
    assert!(validate(&validator, "employeeName", &name).valid);
    let name = "山".repeat(51);
    assert_eq!(
        validate(&validator, "employeeName", &name).error_kind(),
        Some(ErrorKind::ExcessiveLength)
    );
}

#[test]
fn test_invalid_formats() {
    let validator = InputValidator::new();
    assert_eq!(
        validate(&validator, "employeeId", "EMP 001").error_kind(),
        Some(ErrorKind::InvalidFormat)
    );
    assert_eq!(
        validate(&validator, "email", "not-an-email").error_kind(),
        Some(ErrorKind::InvalidFormat)
    );
    assert_eq!(
        validate(&validator, "lostTime", "25:00").error_kind(),
        Some(ErrorKind::InvalidFormat)
    );
    assert_eq!(
        validate(&validator, "cardType", "NANACO").error_kind(),
        Some(ErrorKind::InvalidFormat)
    );
}

#[test]
fn test_calendar_date_check() {
    let validator = InputValidator::new();
    // Matches the structural pattern but is not a real date
    assert_eq!(
        validate(&validator, "lostDate", "2023-02-30").error_kind(),
        Some(ErrorKind::InvalidFormat)
    );
    let future = validate(&validator, "lostDate", "2999-01-01");
    assert_eq!(future.error_kind(), Some(ErrorKind::InvalidFormat));
    assert!(future.error.unwrap().message.contains("future"));
}

#[test]
fn test_card_number_field() {
    let validator = InputValidator::new();

    let result = validate(&validator, "cardNumber", "1234-5678-9012-3456");
    assert!(result.valid);
    assert_eq!(result.sanitized_value.as_deref(), Some("1234567890123456"));

    let result = validate(&validator, "cardNumber", "4111 1111 1111 1112");
    let error = result.error.unwrap();
    assert_eq!(error.kind, ErrorKind::InvalidFormat);
    assert!(error.message.contains("INVALID_CHECKSUM"));
    assert!(error.message.contains("4111********1112"));
    assert!(!error.message.contains("4111 1111 1111 1112"));

    let result = validate(&validator, "cardNumber", "123456789");
    assert!(result.error.unwrap().message.contains("UNKNOWN_CARD_TYPE"));
}

#[test]
fn test_security_violations_fail_closed() {
    let validator = InputValidator::new();

    let cases = [
        ("employeeName", "'; DROP TABLE users; --", SecurityViolationKind::SqlInjection),
        ("description", "1' OR '1'='1", SecurityViolationKind::SqlInjection),
        ("lostLocation", "station; rm -rf /", SecurityViolationKind::OsCommandInjection),
        ("description", "../../etc/passwd", SecurityViolationKind::OsCommandInjection),
        ("employeeName", "<script>alert('x')</script>", SecurityViolationKind::Xss),
        ("contactInfo", "<img src=x onerror=alert(1)>", SecurityViolationKind::Xss),
        ("department", "javascript:alert(document.cookie)", SecurityViolationKind::Xss),
    ];

    for (field, value, expected) in cases {
        let result = validate(&validator, field, value);
        assert!(!result.valid, "{:?} should fail", value);
        assert!(result.sanitized_value.is_none());
        let error = result.error.unwrap();
        assert_eq!(error.kind, ErrorKind::SecurityViolation);
        assert_eq!(error.violation, Some(expected), "value {:?}", value);
        // The message echoes only an escaped four-character preview
        assert!(!error.message.contains(value));
        assert!(!error.message.contains('<'));
    }
}

#[test]
fn test_security_check_precedes_length_check() {
    let validator = InputValidator::new();
    let value = format!("<script>{}</script>", "a".repeat(100));
    let result = validate(&validator, "employeeId", &value);
    assert_eq!(result.error_kind(), Some(ErrorKind::SecurityViolation));
}

#[test]
fn test_sanitized_output() {
    let validator = InputValidator::new();
    let result = validate(&validator, "description", "  財布ごと紛失\u{0}しました  ");
    assert_eq!(result.sanitized_value.as_deref(), Some("財布ごと紛失しました"));
}

#[test]
fn test_non_string_values_are_coerced() {
    let validator = InputValidator::new();

    let result = validator.validate_field(
        "employeeId",
        &FieldValue::from(json!(12345)),
        ValidateOptions::default(),
    );
    assert!(result.valid);
    assert_eq!(result.sanitized_value.as_deref(), Some("12345"));

    let result = validator.validate_field(
        "employeeId",
        &FieldValue::from(json!({"nested": true})),
        ValidateOptions::default(),
    );
    assert_eq!(result.error_kind(), Some(ErrorKind::InvalidFormat));

    let result = validator.validate_field(
        "employeeName",
        &FieldValue::from(json!(null)),
        ValidateOptions::default(),
    );
    assert_eq!(result.error_kind(), Some(ErrorKind::RequiredField));
}

#[test]
fn test_custom_rule_registration() {
    let validator = InputValidator::new();
    let descriptor = FieldRuleDescriptor {
        pattern: Some(r"^[A-Z]{3}$".to_string()),
        max_length: 3,
        required: true,
        sanitize: false,
        description: "Station code".to_string(),
        check: None,
    };

    assert_eq!(
        validate(&validator, "stationCode", "SJK").error_kind(),
        Some(ErrorKind::UnknownField)
    );
    assert!(validator.register_rule("stationCode", &descriptor));
    assert!(validate(&validator, "stationCode", "SJK").valid);
    assert_eq!(
        validate(&validator, "stationCode", "sjk").error_kind(),
        Some(ErrorKind::InvalidFormat)
    );
}

#[test]
fn test_unsanitized_rule_returns_value_unchanged() {
    let validator = InputValidator::new();
    let descriptor = FieldRuleDescriptor {
        pattern: None,
        max_length: 20,
        required: false,
        sanitize: false,
        description: "Raw note".to_string(),
        check: None,
    };
    assert!(validator.register_rule("rawNote", &descriptor));
    let result = validate(&validator, "rawNote", "  keep spacing ");
    assert_eq!(result.sanitized_value.as_deref(), Some("  keep spacing "));
}

#[test]
fn test_control_characters_do_not_split_attack_patterns() {
    let validator = InputValidator::new();
    let cases = [
        ("employeeName", "<scr\u{0}ipt>alert(1)</scr\u{0}ipt>"),
        ("description", "java\tscript:alert(document.cookie)"),
        ("description", "<img src=x on\u{1}error=alert(1)>"),
    ];
    for (field, value) in cases {
        let result = validate(&validator, field, value);
        assert!(!result.valid, "{:?} accepted", value);
        assert_eq!(result.error_kind(), Some(ErrorKind::SecurityViolation));
        assert_eq!(result.violation(), Some(SecurityViolationKind::Xss));
        assert!(result.sanitized_value.is_none());
    }

    let stats = validator.stats();
    assert_eq!(stats.security_violations, 3);
    assert_eq!(stats.xss_attempts, 3);
}

#[test]
fn test_control_character_payload_fails_object_validation() {
    let validator = InputValidator::new();
    let mut data = std::collections::BTreeMap::new();
    data.insert(
        "employeeName".to_string(),
        FieldValue::from("<scr\u{0}ipt>alert(1)</scr\u{0}ipt>"),
    );

    let result = validator.validate_object(&data, &["employeeName"]);
    assert!(!result.valid);
    assert!(result.sanitized_data.is_empty());
    assert_eq!(result.errors[0].kind, ErrorKind::SecurityViolation);
    assert_eq!(validator.stats().security_violations, 1);
}

#[test]
fn test_required_value_blank_after_sanitization() {
    let validator = InputValidator::new();

    // A lone closing tag passes the scan but sanitizes away entirely
    let result = validate(&validator, "employeeName", "</object>");
    assert_eq!(result.error_kind(), Some(ErrorKind::RequiredField));

    let result = validate(&validator, "department", "</object>");
    assert!(result.valid);
    assert_eq!(result.sanitized_value.as_deref(), Some(""));

    let result = validator.validate_field(
        "employeeName",
        &FieldValue::from("</object>"),
        ValidateOptions { allow_empty: true },
    );
    assert!(result.valid);
}
