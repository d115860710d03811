//! NIBRS line parser tests

mod common;

use common::{batch_header_line, fixed_width};
use nibrs_ingest::chunk::{process_chunk, Chunk};
use nibrs_ingest::extract::extract;
use nibrs_ingest::models::{FieldValue, Record};
use nibrs_ingest::parser::{parse_line, Decoding};
use nibrs_ingest::schema::{schema_for, RecordType};
use proptest::prelude::*;
use std::collections::BTreeMap;

fn scalar<'a>(record: &'a Record, name: &str) -> &'a str {
    record
        .get(name)
        .and_then(FieldValue::as_scalar)
        .unwrap_or_else(|| panic!("{} is not a scalar", name))
}

fn repeated<'a>(record: &'a Record, name: &str) -> &'a [String] {
    record
        .get(name)
        .and_then(FieldValue::as_repeated)
        .unwrap_or_else(|| panic!("{} is not repeated", name))
}

// ============================================================================
// LAYOUT SCENARIOS
// ============================================================================

#[test]
fn test_batch_header_trims_city_only() {
    let line = fixed_width(
        "BH",
        75,
        &[
            (8, "2023"),
            (16, "TX0010000"),
            (40, "  HOUSTON                "),
            (65, "TX"),
            (67, "02300000"),
        ],
    );

    let record = parse_line(line.as_bytes()).unwrap().unwrap();
    assert_eq!(record.record_type, RecordType::BatchHeader);
    assert_eq!(scalar(&record, "ORI"), "TX0010000");
    assert_eq!(scalar(&record, "City"), "HOUSTON");
    assert_eq!(scalar(&record, "State"), "TX");
    assert_eq!(scalar(&record, "Population"), "02300000");
    assert_eq!(scalar(&record, "Year"), "2023");
}

#[test]
fn test_padding_kept_outside_city() {
    let line = fixed_width("BH", 75, &[(16, "TX001"), (40, "AUSTIN")]);
    let record = parse_line(line.as_bytes()).unwrap().unwrap();
    assert_eq!(scalar(&record, "ORI"), "TX001    ");
    assert_eq!(scalar(&record, "City"), "AUSTIN");
}

#[test]
fn test_batch_header_field_order() {
    let record = parse_line(batch_header_line("TX0010000", "DALLAS").as_bytes())
        .unwrap()
        .unwrap();
    let names: Vec<_> = record.fields().map(|(name, _)| name).collect();
    assert_eq!(names, vec!["ORI", "City", "State", "Population", "Year"]);
}

#[test]
fn test_property_groups_follow_stride_not_width() {
    let line = fixed_width(
        "03",
        232,
        &[
            (16, "TX0010000"),
            (25, "INC-00000001"),
            (37, "7"),
            (38, "10"),
            (40, "00000500"),
            (48, "20230201"),
            (59, "20"),
            (61, "00001000"),
            (228, "01"),
            (230, "00"),
        ],
    );

    let record = parse_line(line.as_bytes()).unwrap().unwrap();
    let descriptions = repeated(&record, "Property_Description");
    let values = repeated(&record, "Property_Value");
    let recovered = repeated(&record, "Date_Recovered");

    assert_eq!(descriptions.len(), 10);
    assert_eq!(descriptions[0], "10");
    assert_eq!(descriptions[1], "20");
    assert_eq!(values[0], "00000500");
    assert_eq!(values[1], "00001000");
    assert_eq!(recovered[0], "20230201");
    assert_eq!(scalar(&record, "Type_Property_Loss"), "7");
    assert_eq!(scalar(&record, "Number_Stolen_Vehicles"), "01");
    assert_eq!(scalar(&record, "Number_Recovered_Vehicles"), "00");
}

#[test]
fn test_offense_repeated_groups() {
    let line = fixed_width(
        "02",
        63,
        &[
            (37, "13A"),
            (40, "C"),
            (41, "ADN"),
            (44, "20"),
            (49, "BGCN  "),
            (55, "11  40"),
            (61, "88"),
        ],
    );

    let record = parse_line(line.as_bytes()).unwrap().unwrap();
    assert_eq!(repeated(&record, "Offender_Suspected_of_Using"), ["A", "D", "N"]);
    assert_eq!(repeated(&record, "Type_Criminal_Activity"), ["BG", "CN", "  "]);
    assert_eq!(repeated(&record, "Weapon_Force_Involved"), ["11", "  ", "40"]);
    assert_eq!(scalar(&record, "Location_Type"), "20");
    assert_eq!(scalar(&record, "Bias_Motivation"), "88");
}

#[test]
fn test_victim_offense_codes_and_injuries() {
    let line = fixed_width(
        "04",
        89,
        &[(37, "001"), (40, "13A13B"), (70, "I"), (71, "0034"), (84, "BM")],
    );

    let record = parse_line(line.as_bytes()).unwrap().unwrap();
    let codes = repeated(&record, "Victim_Connected_UCR_Offense_Code");
    assert_eq!(codes.len(), 10);
    assert_eq!(&codes[..3], ["13A", "13B", "   "]);
    assert_eq!(scalar(&record, "Age_of_Victim"), "0034");
    assert_eq!(repeated(&record, "Type_Injury"), ["B", "M", " ", " ", " "]);
}

#[test]
fn test_arrestee_gap_is_not_read() {
    let line = fixed_width("06", 79, &[(64, "1112"), (68, "XX"), (70, "0019"), (74, "F")]);
    let record = parse_line(line.as_bytes()).unwrap().unwrap();
    assert_eq!(repeated(&record, "Arrestee_Was_Armed_With"), ["11", "12"]);
    assert_eq!(scalar(&record, "Age_of_Arrestee"), "0019");
    assert_eq!(scalar(&record, "Sex_of_Arrestee"), "F");
    assert!(record.values.iter().all(|v| match v {
        FieldValue::Scalar(s) => !s.contains("XX"),
        FieldValue::Repeated(vs) => vs.iter().all(|s| !s.contains("XX")),
    }));
}

// ============================================================================
// SHORT LINES AND UNKNOWN TAGS
// ============================================================================

#[test]
fn test_truncated_property_line() {
    let line = fixed_width("03", 45, &[(38, "10"), (40, "00000")]);
    let record = parse_line(line.as_bytes()).unwrap().unwrap();

    assert_eq!(repeated(&record, "Property_Description")[0], "10");
    assert_eq!(repeated(&record, "Property_Value")[0], "00000");
    assert_eq!(repeated(&record, "Date_Recovered")[0], "");
    assert_eq!(repeated(&record, "Property_Description")[9], "");
    assert_eq!(scalar(&record, "Number_Stolen_Vehicles"), "");
}

#[test]
fn test_unknown_tags_yield_nothing() {
    for tag in ["00", "07", "99", "bh", "  ", "W1"] {
        let line = format!("{}{}", tag, " ".repeat(100));
        assert_eq!(parse_line(line.as_bytes()).unwrap(), None, "tag {:?}", tag);
    }
}

// ============================================================================
// PROPERTIES
// ============================================================================

fn known_tag() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec!["BH", "01", "02", "03", "04", "05", "06"])
}

fn tagged_line() -> impl Strategy<Value = String> {
    (known_tag(), "[ -~]{0,260}").prop_map(|(tag, body)| format!("{}{}", tag, body))
}

proptest! {
    #[test]
    fn prop_fields_reproduce_source_bytes(line in tagged_line()) {
        let bytes = line.as_bytes();
        let schema = schema_for(&bytes[..2]).unwrap();
        let record = parse_line(bytes).unwrap().unwrap();
        prop_assert_eq!(record.values.len(), schema.fields.len());

        for (field, value) in schema.fields.iter().zip(&record.values) {
            let expected: Vec<String> = field
                .ranges()
                .map(|(start, end)| {
                    let raw = std::str::from_utf8(extract(bytes, start, end)).unwrap();
                    if field.trim { raw.trim().to_string() } else { raw.to_string() }
                })
                .collect();
            match value {
                FieldValue::Scalar(s) => {
                    prop_assert!(!field.is_repeated());
                    prop_assert_eq!(vec![s.clone()], expected);
                }
                FieldValue::Repeated(values) => {
                    prop_assert!(field.is_repeated());
                    prop_assert_eq!(values, &expected);
                }
            }
        }
    }

    #[test]
    fn prop_short_lines_degrade_to_prefix(line in tagged_line()) {
        let bytes = line.as_bytes();
        let schema = schema_for(&bytes[..2]).unwrap();
        let record = parse_line(bytes).unwrap().unwrap();

        for (field, value) in schema.fields.iter().zip(&record.values) {
            if field.trim {
                continue;
            }
            let values = match value {
                FieldValue::Scalar(s) => vec![s.clone()],
                FieldValue::Repeated(vs) => vs.clone(),
            };
            for ((start, end), got) in field.ranges().zip(values) {
                if start >= bytes.len() {
                    prop_assert_eq!(got, "");
                } else {
                    prop_assert_eq!(got.len(), end.min(bytes.len()) - start);
                }
            }
        }
    }

    #[test]
    fn prop_valid_utf8_lines_always_yield_a_record(tag in known_tag(), body in "\\PC{0,200}") {
        let line = format!("{}{}", tag, body);
        let record = parse_line(line.as_bytes()).unwrap();
        prop_assert!(record.is_some());
    }

    #[test]
    fn prop_unknown_tags_are_dropped(tag in "[ -~]{2}", body in "[ -~]{0,80}") {
        prop_assume!(schema_for(tag.as_bytes()).is_none());
        let line = format!("{}{}", tag, body);
        prop_assert_eq!(parse_line(line.as_bytes()).unwrap(), None);
    }

    #[test]
    fn prop_chunk_size_does_not_change_counts(
        lines in prop::collection::vec(prop_oneof![tagged_line(), "[ -~]{0,40}"], 0..60)
    ) {
        let lines: Vec<Vec<u8>> = lines.into_iter().map(String::into_bytes).collect();

        let whole = Chunk { seq: 0, first_line: 1, lines: lines.clone() };
        let expected = process_chunk(&whole, Decoding::Strict).batch.counts();

        let mut per_line: BTreeMap<RecordType, u64> = BTreeMap::new();
        for (i, line) in lines.into_iter().enumerate() {
            let single = Chunk { seq: i as u64, first_line: i as u64 + 1, lines: vec![line] };
            for (record_type, count) in process_chunk(&single, Decoding::Strict).batch.counts() {
                *per_line.entry(record_type).or_default() += count;
            }
        }

        prop_assert_eq!(per_line, expected);
    }
}
