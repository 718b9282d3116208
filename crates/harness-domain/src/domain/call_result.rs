//! Values returned by a contract call.

use std::fmt;

use serde::Serialize;

use super::felt::Felt;
use super::literal::Literal;
use super::short_string::decode_short_string;

/// Ordered, immutable sequence of felts returned by one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CallResult {
    values: Vec<Felt>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mismatch {
    Length { expected: usize, actual: usize },
    Element { index: usize },
}

impl CallResult {
    pub fn new(values: Vec<Felt>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[Felt] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// First difference against `expected`, comparing lengths before elements.
    pub fn first_mismatch(&self, expected: &[Felt]) -> Option<Mismatch> {
        if self.values.len() != expected.len() {
            return Some(Mismatch::Length {
                expected: expected.len(),
                actual: self.values.len(),
            });
        }
        self.values
            .iter()
            .zip(expected)
            .position(|(actual, expected)| actual != expected)
            .map(|index| Mismatch::Element { index })
    }

    /// Tuple rendering that shows each value the way its expected literal is
    /// written, so a string expectation is compared against decoded text.
    pub fn render_like(&self, expected: &[Literal]) -> String {
        let parts: Vec<String> = self
            .values
            .iter()
            .enumerate()
            .map(|(index, value)| match expected.get(index) {
                Some(literal) if literal.is_short_string() => match decode_short_string(value) {
                    Some(text) => format!("'{}'", text),
                    None => value.to_string(),
                },
                Some(_) => value.to_string(),
                None => render_guess(value),
            })
            .collect();
        render_tuple(&parts)
    }

    /// Each value as text: decoded short string where it reads as one.
    pub fn decoded(&self) -> Vec<String> {
        self.values
            .iter()
            .map(|value| looks_like_text(value).unwrap_or_else(|| value.to_string()))
            .collect()
    }
}

pub fn render_literals(literals: &[Literal]) -> String {
    let parts: Vec<String> = literals.iter().map(ToString::to_string).collect();
    render_tuple(&parts)
}

fn render_tuple(parts: &[String]) -> String {
    match parts {
        [] => "()".to_string(),
        [single] => format!("({},)", single),
        many => format!("({})", many.join(", ")),
    }
}

// Single printable bytes are ambiguous with small integers, so only multi-byte
// values containing a letter are shown as text.
fn looks_like_text(value: &Felt) -> Option<String> {
    decode_short_string(value)
        .filter(|text| text.len() >= 2 && text.chars().any(|c| c.is_ascii_alphabetic()))
}

fn render_guess(value: &Felt) -> String {
    match looks_like_text(value) {
        Some(text) => format!("'{}'", text),
        None => value.to_string(),
    }
}

impl fmt::Display for CallResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.values.iter().map(render_guess).collect();
        write!(f, "{}", render_tuple(&parts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::encode_short_string;

    fn greeting() -> CallResult {
        CallResult::new(vec![encode_short_string("God bless Ezen-wata").unwrap()])
    }

    #[test]
    fn test_display_uses_python_tuple_notation() {
        assert_eq!(greeting().to_string(), "('God bless Ezen-wata',)");
        assert_eq!(CallResult::new(vec![]).to_string(), "()");
        assert_eq!(
            CallResult::new(vec![Felt::from(1u64), Felt::from(2u64)]).to_string(),
            "(1, 2)"
        );
    }

    #[test]
    fn test_first_mismatch_reports_length_before_elements() {
        let result = CallResult::new(vec![Felt::from(1u64)]);
        assert_eq!(
            result.first_mismatch(&[Felt::from(2u64), Felt::from(3u64)]),
            Some(Mismatch::Length {
                expected: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn test_first_mismatch_is_order_sensitive() {
        let result = CallResult::new(vec![Felt::from(1u64), Felt::from(2u64)]);
        assert_eq!(
            result.first_mismatch(&[Felt::from(2u64), Felt::from(1u64)]),
            Some(Mismatch::Element { index: 0 })
        );
        assert_eq!(
            result.first_mismatch(&[Felt::from(1u64), Felt::from(2u64)]),
            None
        );
    }

    #[test]
    fn test_render_like_follows_expected_literal_kinds() {
        let result = CallResult::new(vec![Felt::from(0x4869u64), Felt::from(0x4869u64)]);
        let expected = [Literal::from("Hi"), Literal::from(0u64)];
        assert_eq!(result.render_like(&expected), "('Hi', 18537)");
    }

    #[test]
    fn test_small_numbers_are_not_guessed_as_text() {
        let result = CallResult::new(vec![Felt::from(42u64)]);
        assert_eq!(result.decoded(), vec!["42".to_string()]);
    }

    #[test]
    fn test_render_literals() {
        assert_eq!(
            render_literals(&[Literal::from("God bless Ezen-wata")]),
            "('God bless Ezen-wata',)"
        );
    }
}
