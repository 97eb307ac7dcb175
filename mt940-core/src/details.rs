mod utils;
use serde::Serialize;
use std::collections::BTreeMap;
use utils::*;

/// Структурированный разбор текста :86:
///
/// Понимает два распространённых вида:
/// * подполя с вопросительным знаком: `166?00GUTSCHRIFT?20...?32NAME`
///   (часть до первого `?NN` - код операции, [`StructuredDetails::code`]);
/// * коды со слэшами: `/EREF/123/REMI/Invoice 7/ORDP/ACME`.
///
/// Остальной текст даёт пустой набор подполей. Независимо от вида ищется
/// IBAN контрагента и его имя.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StructuredDetails {
    /// код операции (GVC), только для формата с `?NN`
    pub code: Option<String>,
    /// подполя: "20", "32" или "EREF", "REMI", ...
    pub fields: BTreeMap<String, String>,
    pub counterparty_iban: Option<String>,
    pub counterparty_name: Option<String>,
}

impl StructuredDetails {
    pub fn parse(details: &str) -> Self {
        let lines: Vec<&str> = details
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();

        // переносы строк внутри :86: не значимы
        let joined = lines.concat();

        let (code, fields) = match detect_layout(&joined) {
            Layout::QuestionMark => split_question_mark_fields(&joined),
            Layout::Slash => (None, split_slash_fields(&joined)),
            Layout::Free => (None, BTreeMap::new()),
        };

        let (counterparty_iban, counterparty_name) = counterparty_from_fields(&fields)
            .or_else(|| find_iban_and_name_in_lines(&lines))
            .map(|(iban, name)| (Some(iban), name))
            .unwrap_or_default();

        StructuredDetails {
            code,
            fields,
            counterparty_iban,
            counterparty_name,
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }
}

/// Контрагент из известных подполей: ?31/?32/?33 или /IBAN/ /NAME/ /ORDP/ /BENM/
fn counterparty_from_fields(fields: &BTreeMap<String, String>) -> Option<(String, Option<String>)> {
    let iban = ["31", "IBAN"]
        .iter()
        .filter_map(|key| fields.get(*key))
        .find_map(|value| iban_from_field(value))?;

    // ?32 и ?33 - одно имя, разрезанное по длине подполя
    let name: String = ["32", "33"]
        .iter()
        .filter_map(|key| fields.get(*key))
        .map(|value| value.as_str())
        .collect();
    let name = name.trim();

    let name = if name.is_empty() {
        ["NAME", "ORDP", "BENM"]
            .iter()
            .filter_map(|key| fields.get(*key))
            .map(|value| value.trim())
            .find(|value| !value.is_empty())
            .map(str::to_string)
    } else {
        Some(name.to_string())
    };

    Some((iban, name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_question_mark_details_across_lines() {
        let text = "166?00GUTSCHRIFT?20EREF+INV-7\n?21PAYMENT?31DE02123412341234123412\n?32MUSTERMANN GMB?33H";

        let parsed = StructuredDetails::parse(text);

        assert_eq!(parsed.code.as_deref(), Some("166"));
        assert_eq!(parsed.get("00"), Some("GUTSCHRIFT"));
        assert_eq!(parsed.get("20"), Some("EREF+INV-7"));
        assert_eq!(parsed.get("21"), Some("PAYMENT"));
        assert_eq!(parsed.counterparty_iban.as_deref(), Some("DE02123412341234123412"));
        assert_eq!(parsed.counterparty_name.as_deref(), Some("MUSTERMANN GMBH"));
    }

    #[test]
    fn parses_slash_details() {
        let text = "/EREF/E2E-1/REMI/Invoice 7\n/IBAN/DE02 1234 1234 1234 1234 12/NAME/ACME LTD";

        let parsed = StructuredDetails::parse(text);

        assert!(parsed.code.is_none());
        assert_eq!(parsed.get("EREF"), Some("E2E-1"));
        assert_eq!(parsed.get("REMI"), Some("Invoice 7"));
        assert_eq!(parsed.counterparty_iban.as_deref(), Some("DE02123412341234123412"));
        assert_eq!(parsed.counterparty_name.as_deref(), Some("ACME LTD"));
    }

    #[test]
    fn free_text_falls_back_to_iban_scan() {
        let text = "Rent March\nDE02123412341234123412 JOHN DOE";

        let parsed = StructuredDetails::parse(text);

        assert!(parsed.fields.is_empty());
        assert_eq!(parsed.counterparty_iban.as_deref(), Some("DE02123412341234123412"));
        assert_eq!(parsed.counterparty_name.as_deref(), Some("JOHN DOE"));
    }

    #[test]
    fn question_mark_inside_free_text_is_not_a_subfield() {
        let parsed = StructuredDetails::parse("Why?12 boxes were returned");

        assert!(parsed.code.is_none());
        assert!(parsed.fields.is_empty());
    }

    #[test]
    fn plain_text_has_no_structure() {
        let parsed = StructuredDetails::parse("Just text");
        assert_eq!(parsed, StructuredDetails::default());
    }
}
