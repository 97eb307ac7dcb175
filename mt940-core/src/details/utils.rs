use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

static IBAN_RE: Lazy<Regex> = Lazy::new(|| {
    // 2 буквы страны, 2 контрольные цифры, 11-30 символов BBAN
    Regex::new(r"^[A-Z]{2}[0-9]{2}[A-Z0-9]{11,30}$").unwrap()
});

/// "?20", "?32" - подполя немецкого формата :86:
static QUESTION_MARK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\?[0-9]{2}").unwrap());

/// формат с "?NN" начинается с кода операции (до 3 цифр) и первого подполя
static QUESTION_MARK_START_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{0,3}\?[0-9]{2}").unwrap());

/// "/EREF/", "/REMI/" - коды в формате со слэшами; код начинается с буквы,
/// чтобы "/2023/" внутри текста не считалось кодом
static SLASH_CODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"/[A-Z][A-Z0-9]{1,3}/").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Layout {
    QuestionMark,
    Slash,
    Free,
}

pub(super) fn detect_layout(text: &str) -> Layout {
    if QUESTION_MARK_START_RE.is_match(text) {
        return Layout::QuestionMark;
    }
    match SLASH_CODE_RE.find(text) {
        Some(m) if m.start() == 0 => Layout::Slash,
        _ => Layout::Free,
    }
}

/// Разбирает "166?00GUTSCHRIFT?20ref?21more" в код операции "166" и подполя
pub(super) fn split_question_mark_fields(text: &str) -> (Option<String>, BTreeMap<String, String>) {
    let marks: Vec<_> = QUESTION_MARK_RE.find_iter(text).collect();
    let mut fields: BTreeMap<String, String> = BTreeMap::new();

    let Some(first) = marks.first() else {
        return (None, fields);
    };

    let code = text[..first.start()].trim();
    let code = (!code.is_empty()).then(|| code.to_string());

    for (idx, mark) in marks.iter().enumerate() {
        let key = &text[mark.start() + 1..mark.end()];
        let end = marks.get(idx + 1).map_or(text.len(), |next| next.start());
        // повторяющиеся ключи (перенос длинного текста) склеиваются
        fields
            .entry(key.to_string())
            .or_default()
            .push_str(&text[mark.end()..end]);
    }

    (code, fields)
}

/// Разбирает "/EREF/123/REMI/Invoice 7/" в подполя EREF, REMI
pub(super) fn split_slash_fields(text: &str) -> BTreeMap<String, String> {
    let marks: Vec<_> = SLASH_CODE_RE.find_iter(text).collect();
    let mut fields: BTreeMap<String, String> = BTreeMap::new();

    for (idx, mark) in marks.iter().enumerate() {
        let key = &text[mark.start() + 1..mark.end() - 1];
        let end = marks.get(idx + 1).map_or(text.len(), |next| next.start());
        let value = text[mark.end()..end].trim().trim_end_matches('/').trim();

        let slot = fields.entry(key.to_string()).or_default();
        if !slot.is_empty() && !value.is_empty() {
            slot.push(' ');
        }
        slot.push_str(value);
    }

    fields
}

/// Приводит токен к виду IBAN (без пробелов и мусора по краям, в верхнем регистре)
pub(super) fn normalize_and_check_iban(token: &str) -> Option<String> {
    let cleaned = token
        .trim_matches(|c: char| !c.is_ascii_alphanumeric())
        .to_uppercase();

    IBAN_RE.is_match(&cleaned).then_some(cleaned)
}

/// IBAN из подполя может быть записан группами через пробел
pub(super) fn iban_from_field(value: &str) -> Option<String> {
    let compact: String = value.split_whitespace().collect();
    normalize_and_check_iban(&compact)
}

/// Ищет IBAN-подобный токен в строке, всё после него считается именем
pub(super) fn find_iban_and_name_in_line(line: &str) -> Option<(String, Option<String>)> {
    let tokens: Vec<&str> = line.split_whitespace().collect();

    tokens.iter().enumerate().find_map(|(idx, token)| {
        let iban = normalize_and_check_iban(token)?;
        let rest = tokens[idx + 1..].join(" ");
        let name = (!rest.is_empty()).then_some(rest);
        Some((iban, name))
    })
}

/// Ищет IBAN + имя в наборе строк.
///
/// Сначала строка, где есть и IBAN, и имя; иначе первая строка с IBAN,
/// а имя берётся из следующей непустой строки без IBAN.
pub(super) fn find_iban_and_name_in_lines(lines: &[&str]) -> Option<(String, Option<String>)> {
    let found: Vec<(usize, String, Option<String>)> = lines
        .iter()
        .enumerate()
        .filter_map(|(idx, line)| {
            find_iban_and_name_in_line(line).map(|(iban, name)| (idx, iban, name))
        })
        .collect();

    if let Some((_, iban, name)) = found.iter().find(|(_, _, name)| name.is_some()) {
        return Some((iban.clone(), name.clone()));
    }

    let (idx, iban, _) = found.into_iter().next()?;
    let name = lines
        .iter()
        .skip(idx + 1)
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .find(|line| find_iban_and_name_in_line(line).is_none())
        .map(str::to_string);

    Some((iban, name))
}
