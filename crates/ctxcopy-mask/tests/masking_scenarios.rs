//! Integration test: end-to-end masking passes
//!
//! These tests drive the public entry points the way a host does: build a
//! configuration snapshot, run one pass, and check the result against the
//! structural guarantees callers rely on.

use ctxcopy_mask::catalog::validators::abn_check;
use ctxcopy_mask::{
    CsvOptions, DocumentKind, HeaderMode, MaskingConfig, MaskingStrategy, PiiType, mask_cdata_content,
    mask_csv_text, mask_document, mask_text, mask_xml_text,
};

fn config(strategy: MaskingStrategy) -> MaskingConfig {
    let mut config = MaskingConfig::enabled();
    config.strategy = strategy;
    config
}

const MIXED: &str = "Contact jane@corp.io or 0412 345 678.\n\
                     Card 4532015112830366, ABN 51 824 753 556, password=Sup3rS3cret!\n\
                     IBAN GB82 WEST 1234 5698 7654 32";

#[test]
fn test_contact_and_card_scenario() {
    let text = "Contact: jane.doe@example.com, card 4532 1234 5678 9010";
    let result = mask_text(text, &config(MaskingStrategy::Full));

    assert_eq!(
        result.masked_text,
        "Contact: ********************, card *******************"
    );
    assert!(result.masking_applied);

    let types: Vec<PiiType> = result.detections.iter().map(|d| d.pii_type).collect();
    assert_eq!(types, vec![PiiType::Email, PiiType::CreditCard]);
    assert_eq!(result.detections[0].start, 9);
    assert_eq!(result.detections[1].start, 36);
}

#[test]
fn test_length_preserved_for_full_and_partial() {
    for strategy in [MaskingStrategy::Full, MaskingStrategy::Partial] {
        let result = mask_text(MIXED, &config(strategy));

        assert!(result.detections.len() >= 5, "{:?}", result.detections);
        assert_eq!(result.masked_text.chars().count(), MIXED.chars().count());
        for detection in &result.detections {
            assert_eq!(
                detection.masked.chars().count(),
                detection.text.chars().count(),
                "{} changed length under {}",
                detection.rule,
                strategy.as_str()
            );
        }
    }
}

#[test]
fn test_masked_output_is_not_detected_again() {
    for strategy in [MaskingStrategy::Full, MaskingStrategy::Partial] {
        let config = config(strategy);
        let first = mask_text(MIXED, &config);
        let second = mask_text(&first.masked_text, &config);

        assert!(second.detections.is_empty(), "{:?}", second.detections);
        assert_eq!(second.masked_text, first.masked_text);
    }
}

#[test]
fn test_detections_sorted_and_disjoint() {
    let result = mask_text(MIXED, &config(MaskingStrategy::Partial));

    for pair in result.detections.windows(2) {
        assert!(pair[0].end <= pair[1].start);
    }
}

/// Weighted modulus 89 with the first digit decremented, computed independently
fn reference_abn(digits: &[u32; 11]) -> bool {
    const WEIGHTS: [u32; 11] = [10, 1, 3, 5, 7, 9, 11, 13, 15, 17, 19];
    let mut digits = *digits;
    digits[0] -= 1;
    digits.iter().zip(WEIGHTS).map(|(d, w)| d * w).sum::<u32>() % 89 == 0
}

#[test]
fn test_abn_checksum_matches_reference() {
    assert!(reference_abn(&[5, 1, 8, 2, 4, 7, 5, 3, 5, 5, 6]));
    assert!(abn_check("51 824 753 556"));

    // Neighbouring permutation of the valid number
    assert!(!reference_abn(&[6, 1, 8, 2, 4, 7, 5, 3, 5, 5, 6]));
    assert!(!abn_check("61 824 753 556"));

    let scenario = [1, 2, 3, 4, 5, 6, 7, 8, 9, 0, 1];
    assert_eq!(abn_check("12 345 678 901"), reference_abn(&scenario));
    assert!(!abn_check("12 345 678 901"));
}

#[test]
fn test_invalid_abn_is_not_masked() {
    let result = mask_text("ABN 12 345 678 901", &config(MaskingStrategy::Full));
    assert!(
        result
            .detections
            .iter()
            .all(|d| d.pii_type != PiiType::AustralianAbn)
    );
}

#[test]
fn test_csv_quoted_delimiter_and_cell_isolation() {
    let mut config = config(MaskingStrategy::Full);
    config.csv = CsvOptions {
        header: HeaderMode::FirstRow,
        ..CsvOptions::default()
    };

    let text = "id,name,contact\n1,\"Doe, Jane\",jane@corp.io\n2,\"Roe, Rick\",n/a";
    let result = mask_csv_text(text, &config, None);

    assert_eq!(
        result.masked_text,
        "id,name,contact\n1,\"Doe, Jane\",************\n2,\"Roe, Rick\",n/a"
    );
    assert_eq!(result.masked_text.chars().count(), text.chars().count());
    assert_eq!(result.detections.len(), 1);
    assert_eq!(result.detections[0].line, 2);
}

#[test]
fn test_xml_attribute_untouched() {
    let xml = r#"<contact email="jane@corp.io" id="7"><name>Jane</name><mail>jane@corp.io</mail></contact>"#;
    let result = mask_xml_text(xml, &config(MaskingStrategy::Full));

    assert_eq!(
        result.masked_text,
        r#"<contact email="jane@corp.io" id="7"><name>Jane</name><mail>************</mail></contact>"#
    );
    assert_eq!(result.masked_text.chars().count(), xml.chars().count());
}

#[test]
fn test_cdata_markers_byte_identical() {
    let xml = "<msg>\n  <![CDATA[Reach me at jane@corp.io]]>\n</msg>";
    let result = mask_xml_text(xml, &config(MaskingStrategy::Partial));

    let open = xml.find("<![CDATA[").unwrap();
    let close = xml.find("]]>").unwrap();
    assert_eq!(&result.masked_text[open..open + 9], "<![CDATA[");
    assert_eq!(&result.masked_text[close..close + 3], "]]>");
    assert_eq!(result.masked_text.chars().count(), xml.chars().count());
    assert_eq!(result.detections.len(), 1);
    assert_eq!(result.detections[0].line, 2);
}

#[test]
fn test_bare_cdata_payload() {
    let result = mask_cdata_content("Reach me at jane@corp.io", &config(MaskingStrategy::Full));
    assert_eq!(result.masked_text, "Reach me at ************");
}

#[test]
fn test_angle_brackets_do_not_hide_values() {
    let full = config(MaskingStrategy::Full);

    let result = mask_text("From: Jane Doe <jane@corp.io>", &full);
    assert_eq!(result.masked_text, "From: Jane Doe <************>");

    let xml = "<m><![CDATA[a < b jane@corp.io]]></m>";
    let result = mask_xml_text(xml, &full);
    assert_eq!(result.masked_text, "<m><![CDATA[a < b ************]]></m>");

    let result = mask_csv_text("name,contact\nJane,Jane <jane@corp.io>", &full, None);
    assert_eq!(result.masked_text, "name,contact\nJane,Jane <************>");
}

#[test]
fn test_type_tag_refused_by_structural_adapter() {
    let xml = "<a>jane@corp.io</a>";
    let result = mask_xml_text(xml, &config(MaskingStrategy::TypeTag));

    assert_eq!(result.masked_text, xml);
    assert!(result.detections.is_empty());
    assert!(!result.masking_applied);

    let plain = mask_text("mail jane@corp.io", &config(MaskingStrategy::TypeTag));
    assert_eq!(plain.masked_text, "mail [EMAIL]");
}

#[test]
fn test_sniffed_document_dispatch() {
    let config = config(MaskingStrategy::Full);
    let text = "name,contact\nJane,jane@corp.io\nJohn,john@corp.io\n";

    let kind = DocumentKind::sniff(text, &Default::default());
    assert_eq!(kind, DocumentKind::Csv);

    let result = mask_document(text, &config, kind, None);
    assert_eq!(
        result.masked_text,
        "name,contact\nJane,************\nJohn,************\n"
    );
}

#[test]
fn test_disabled_masking_copies_verbatim() {
    let result = mask_text(MIXED, &MaskingConfig::default());
    assert_eq!(result.masked_text, MIXED);
    assert!(!result.masking_applied);
}
