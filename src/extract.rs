//! Pulls distribution references out of a task's raw stdout.
//!
//! Programs print uncertain values as a number immediately followed by a
//! `Ux` token, e.g. `1.5Ux0000...`. A program may print many of them while
//! it runs; the last one printed is the final result.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::AnalysisError;

/// A printed value together with the Ux token that encodes its distribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UxValue {
    /// The particle value as printed, e.g. `-1.25e-3`.
    pub value: String,
    /// `Ux` followed by at least 40 hex digits.
    pub ux_string: String,
}

fn ux_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"([-+]?(?:[0-9]+\.[0-9]*|\.[0-9]+)(?:[eE][-+]?[0-9]+)?)(Ux[0-9a-fA-F]{40,})")
            .expect("Ux pattern compiles")
    })
}

fn value_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"<ValueID>(.*?)</ValueID>").expect("ValueID pattern compiles"))
}

/// All Ux values in `output`, in the order they were printed.
pub fn extract_ux_values(output: &str) -> Vec<UxValue> {
    ux_pattern()
        .captures_iter(output)
        .map(|caps| UxValue {
            value: caps[1].to_string(),
            ux_string: caps[2].to_string(),
        })
        .collect()
}

/// The last Ux value printed, i.e. the program's final result.
pub fn last_ux_value(output: &str) -> Result<UxValue, AnalysisError> {
    extract_ux_values(output)
        .pop()
        .ok_or(AnalysisError::Extraction { what: "Ux value" })
}

/// Contents of every `<ValueID>...</ValueID>` tag, in order.
pub fn extract_value_ids(output: &str) -> Vec<String> {
    value_id_pattern()
        .captures_iter(output)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// The last non-empty value ID printed.
pub fn last_value_id(output: &str) -> Result<String, AnalysisError> {
    extract_value_ids(output)
        .into_iter()
        .rev()
        .find(|id| !id.trim().is_empty())
        .ok_or(AnalysisError::Extraction { what: "ValueID tag" })
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEX_A: &str = "1234567890abcdef1234567890abcdef12345678";
    const HEX_B: &str = "abcdefabcdefabcdefabcdefabcdefabcdefabcd";

    #[test]
    fn no_tokens_is_extraction_error() {
        let err = last_ux_value("result = 42\nall done\n").unwrap_err();
        assert!(matches!(err, AnalysisError::Extraction { .. }));
        assert!(extract_ux_values("").is_empty());
    }

    #[test]
    fn last_match_wins() {
        let output = format!("3.14Ux{HEX_A} 2.0Ux{HEX_B}");
        let value = last_ux_value(&output).unwrap();
        assert_eq!(value.value, "2.0");
        assert_eq!(value.ux_string, format!("Ux{HEX_B}"));
    }

    #[test]
    fn all_matches_in_document_order() {
        let output = format!("a=1.0Ux{HEX_A}\nb=2.5Ux{HEX_B}\nc=3.Ux{HEX_A}\n");
        let values: Vec<_> = extract_ux_values(&output)
            .into_iter()
            .map(|v| v.value)
            .collect();
        assert_eq!(values, vec!["1.0", "2.5", "3."]);
    }

    #[test]
    fn signed_and_exponent_values() {
        let output = format!("x=-1.25e-3Ux{HEX_A} y=+.5E+2Ux{HEX_B}");
        let values = extract_ux_values(&output);
        assert_eq!(values[0].value, "-1.25e-3");
        assert_eq!(values[1].value, "+.5E+2");
    }

    #[test]
    fn short_hex_is_not_a_token() {
        let output = "1.5Uxdeadbeef";
        assert!(extract_ux_values(output).is_empty());
    }

    #[test]
    fn integer_prefix_without_point_is_not_a_value() {
        let output = format!("7Ux{HEX_A}");
        assert!(extract_ux_values(&output).is_empty());
    }

    #[test]
    fn long_hex_is_taken_whole() {
        let long = format!("{HEX_A}{HEX_B}");
        let output = format!("result=1.5Ux{long} trailing");
        let value = last_ux_value(&output).unwrap();
        assert_eq!(value.ux_string.len(), 2 + long.len());
    }

    #[test]
    fn value_ids_in_order() {
        let output = "<ValueID>a1</ValueID> noise <ValueID>b2</ValueID>";
        assert_eq!(extract_value_ids(output), vec!["a1", "b2"]);
        assert_eq!(last_value_id(output).unwrap(), "b2");
    }

    #[test]
    fn value_id_match_is_not_greedy() {
        let output = "<ValueID>x</ValueID><ValueID>y</ValueID>";
        assert_eq!(extract_value_ids(output).len(), 2);
    }

    #[test]
    fn missing_value_id_is_extraction_error() {
        assert!(matches!(
            last_value_id("<ValueID></ValueID>"),
            Err(AnalysisError::Extraction { what: "ValueID tag" })
        ));
    }
}
