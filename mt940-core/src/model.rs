use crate::details::StructuredDetails;
use crate::error::Mt940Error;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Код валюты из трёх латинских букв ("EUR", "USD", ...)
///
/// Хранится в верхнем регистре, поэтому сравнение `usd` и `USD` даёт равенство.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    pub fn code(&self) -> &str {
        &self.0
    }
}

impl FromStr for Currency {
    type Err = Mt940Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim();
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(Mt940Error::InvalidCurrency(s.to_string()));
        }
        Ok(Currency(code.to_ascii_uppercase()))
    }
}

impl TryFrom<String> for Currency {
    type Error = Mt940Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Направление (Дебет/Кредит)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Дебет
    Debit,
    /// Кредит
    Credit,
}

impl Direction {
    /// Знак суммы: кредит положительный, дебет отрицательный
    pub fn apply(self, amount: Decimal) -> Decimal {
        match self {
            Direction::Credit => amount.abs(),
            Direction::Debit => -amount.abs(),
        }
    }

    pub fn mark(self) -> char {
        match self {
            Direction::Credit => 'C',
            Direction::Debit => 'D',
        }
    }
}

/// Баланс счёта на дату (:60:, :62:, :64:, :65:)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub date: NaiveDate,
    pub currency: Currency,
    /// знаковая сумма, дебетовый баланс отрицательный
    pub amount: Decimal,
}

impl Balance {
    /// Собирает баланс из признака C/D и суммы без знака
    pub fn new(direction: Direction, date: NaiveDate, currency: Currency, amount: Decimal) -> Self {
        Balance {
            date,
            currency,
            amount: direction.apply(amount),
        }
    }

    pub fn direction(&self) -> Direction {
        if self.amount.is_sign_negative() && !self.amount.is_zero() {
            Direction::Debit
        } else {
            Direction::Credit
        }
    }
}

/// :28C: номер выписки и, опционально, номер последовательности ("49/2")
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementNumber {
    pub statement: u32,
    #[serde(default)]
    pub sequence: Option<u32>,
}

impl fmt::Display for StatementNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.sequence {
            Some(seq) => write!(f, "{}/{}", self.statement, seq),
            None => write!(f, "{}", self.statement),
        }
    }
}

/// Исходный текст тега, сохраняемый при `with_tags`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawTag {
    pub id: String,
    pub data: String,
}

/// Собранная выписка: результат обхода одной группы тегов.
///
/// Создаётся только через [`crate::build_statement`] (или [`crate::read_statements`]),
/// после успешной проверки группы в [`crate::validate_group`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statement {
    /// :20:
    pub transaction_reference: String,
    /// :21:
    pub related_reference: Option<String>,
    /// :25:
    pub account_id: String,
    /// :28C:
    pub number: StatementNumber,
    /// валюта открывающего баланса
    pub currency: Currency,
    /// :60F: / :60M:
    pub opening_balance: Balance,
    /// :62F: / :62M:
    pub closing_balance: Balance,
    /// :64:
    pub closing_available_balance: Option<Balance>,
    /// все :65: в порядке следования
    pub forward_available_balances: Vec<Balance>,
    /// :86:, не относящиеся ни к одной проводке
    pub information_to_account_owner: Option<String>,
    /// проводки в исходном порядке
    pub transactions: Vec<Transaction>,
    /// исходные теги уровня выписки
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<RawTag>>,
}

/// Одна проводка: :61: вместе со следующими за ней :86: и NS
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    pub value_date: NaiveDate,
    pub entry_date: Option<NaiveDate>,
    /// знаковая сумма, расход отрицательный
    pub amount: Decimal,
    pub is_reversal: bool,
    pub currency: Currency,
    pub transaction_type: String,
    pub reference: String,
    pub bank_reference: Option<String>,
    pub funds_code: Option<char>,
    pub extra_details: Option<String>,
    /// текст :86:, строки через '\n'
    pub details: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structured_details: Option<StructuredDetails>,
    pub non_swift: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<RawTag>>,
}

impl Transaction {
    pub fn is_expense(&self) -> bool {
        self.amount.is_sign_negative() && !self.amount.is_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn currency_parses_and_normalizes_case() {
        let ccy: Currency = " usd ".parse().unwrap();
        assert_eq!(ccy.code(), "USD");
        assert_eq!(ccy.to_string(), "USD");
    }

    #[test]
    fn currency_rejects_bad_codes() {
        for bad in ["", "US", "USDT", "U5D"] {
            let err = bad.parse::<Currency>().unwrap_err();
            assert!(
                matches!(err, Mt940Error::InvalidCurrency(_)),
                "unexpected error for '{bad}': {err:?}"
            );
        }
    }

    #[test]
    fn balance_new_applies_direction_sign() {
        let date = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let eur: Currency = "EUR".parse().unwrap();

        let credit = Balance::new(Direction::Credit, date, eur.clone(), dec!(100.00));
        assert_eq!(credit.amount, dec!(100.00));
        assert_eq!(credit.direction(), Direction::Credit);

        let debit = Balance::new(Direction::Debit, date, eur, dec!(100.00));
        assert_eq!(debit.amount, dec!(-100.00));
        assert_eq!(debit.direction(), Direction::Debit);
    }

    #[test]
    fn statement_number_display() {
        let plain = StatementNumber { statement: 49, sequence: None };
        let with_seq = StatementNumber { statement: 49, sequence: Some(2) };
        assert_eq!(plain.to_string(), "49");
        assert_eq!(with_seq.to_string(), "49/2");
    }
}
