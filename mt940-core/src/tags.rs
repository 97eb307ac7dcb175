use crate::amount::format_mt940_amount;
use crate::model::{Balance, Direction, StatementNumber};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Один уже разобранный тег MT940.
///
/// Теги приходят от внешнего токенизатора: `id` как в сообщении ("60F", "28C"),
/// `data` - исходный текст поля, `fields` - типизированные значения.
/// После создания теги не меняются.
///
/// Пример:
/// ```rust
/// use chrono::NaiveDate;
/// use mt940_core::{Balance, Direction, Tag, TagKind};
/// use rust_decimal::Decimal;
///
/// let date = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
/// let usd = "USD".parse().unwrap();
/// let opening = Balance::new(Direction::Credit, date, usd, Decimal::new(10000, 2));
/// let tag = Tag::opening_balance(opening);
///
/// assert_eq!(tag.kind(), TagKind::OpeningBalance);
/// assert_eq!(tag.data, "C230101USD100,00");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: String,
    #[serde(default)]
    pub data: String,
    pub fields: TagFields,
}

/// Типизированное содержимое тега, по варианту на каждый вид
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagFields {
    /// :20:
    TransactionReference { reference: String },
    /// :21:
    RelatedReference { reference: String },
    /// :25:
    AccountIdentification { account: String },
    /// :28C:
    StatementNumber(StatementNumber),
    /// :60F: / :60M:
    OpeningBalance {
        balance: Balance,
        #[serde(default)]
        intermediate: bool,
    },
    /// :62F: / :62M:
    ClosingBalance {
        balance: Balance,
        #[serde(default)]
        intermediate: bool,
    },
    /// :64:
    ClosingAvailableBalance { balance: Balance },
    /// :65:
    ForwardAvailableBalance { balance: Balance },
    /// :61:
    StatementLine(StatementLine),
    /// :86:
    TransactionDetails { details: String },
    /// NS, нестандартный текст банка
    NonSwift { text: String },
}

/// Вид тега без данных
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TagKind {
    TransactionReference,
    RelatedReference,
    AccountIdentification,
    StatementNumber,
    OpeningBalance,
    ClosingBalance,
    ClosingAvailableBalance,
    ForwardAvailableBalance,
    StatementLine,
    TransactionDetails,
    NonSwift,
}

impl TagKind {
    /// Номер тега без буквенного варианта
    pub fn id(self) -> &'static str {
        match self {
            TagKind::TransactionReference => "20",
            TagKind::RelatedReference => "21",
            TagKind::AccountIdentification => "25",
            TagKind::StatementNumber => "28C",
            TagKind::OpeningBalance => "60",
            TagKind::ClosingBalance => "62",
            TagKind::ClosingAvailableBalance => "64",
            TagKind::ForwardAvailableBalance => "65",
            TagKind::StatementLine => "61",
            TagKind::TransactionDetails => "86",
            TagKind::NonSwift => "NS",
        }
    }

    /// Теги, несущие баланс (и валюту)
    pub fn is_balance(self) -> bool {
        matches!(
            self,
            TagKind::OpeningBalance
                | TagKind::ClosingBalance
                | TagKind::ClosingAvailableBalance
                | TagKind::ForwardAvailableBalance
        )
    }
}

impl fmt::Display for TagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Поля строки выписки :61:
///
/// При чтении из JSON знак суммы выводится из `direction` и `is_reversal`,
/// сама сумма может быть записана без знака, как в MT940.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StatementLineRecord")]
pub struct StatementLine {
    /// дата валютирования
    pub value_date: NaiveDate,
    /// дата проводки, если указана
    #[serde(default)]
    pub entry_date: Option<NaiveDate>,
    /// признак C/D как в теге (для сторно - исходное направление)
    pub direction: Direction,
    /// сторно (RC/RD)
    #[serde(default)]
    pub is_reversal: bool,
    /// третий символ кода валюты, если банк его передаёт
    #[serde(default)]
    pub funds_code: Option<char>,
    /// знаковая сумма: приход положительный, расход отрицательный
    pub amount: Decimal,
    /// код операции, напр. "NTRF"
    pub transaction_type: String,
    /// референс клиента, до `//`
    pub reference: String,
    /// референс банка, после `//`
    #[serde(default)]
    pub bank_reference: Option<String>,
    /// вторая строка :61:
    #[serde(default)]
    pub extra_details: Option<String>,
}

/// Строка :61: в том виде, в каком она пришла в JSON
#[derive(Deserialize)]
struct StatementLineRecord {
    value_date: NaiveDate,
    #[serde(default)]
    entry_date: Option<NaiveDate>,
    direction: Direction,
    #[serde(default)]
    is_reversal: bool,
    #[serde(default)]
    funds_code: Option<char>,
    amount: Decimal,
    transaction_type: String,
    reference: String,
    #[serde(default)]
    bank_reference: Option<String>,
    #[serde(default)]
    extra_details: Option<String>,
}

impl From<StatementLineRecord> for StatementLine {
    fn from(record: StatementLineRecord) -> Self {
        let mut amount = record.direction.apply(record.amount);
        if record.is_reversal {
            amount = -amount;
        }

        StatementLine {
            value_date: record.value_date,
            entry_date: record.entry_date,
            direction: record.direction,
            is_reversal: record.is_reversal,
            funds_code: record.funds_code,
            amount,
            transaction_type: record.transaction_type,
            reference: record.reference,
            bank_reference: record.bank_reference,
            extra_details: record.extra_details,
        }
    }
}

impl StatementLine {
    /// Строка с суммой без знака; знак выводится из направления
    pub fn new(value_date: NaiveDate, direction: Direction, amount: Decimal) -> Self {
        StatementLine {
            value_date,
            entry_date: None,
            direction,
            is_reversal: false,
            funds_code: None,
            amount: direction.apply(amount),
            transaction_type: "NTRF".to_string(),
            reference: "NONREF".to_string(),
            bank_reference: None,
            extra_details: None,
        }
    }

    /// Помечает строку как сторно: RC уменьшает остаток, RD увеличивает
    pub fn reversal(mut self) -> Self {
        if !self.is_reversal {
            self.is_reversal = true;
            self.amount = -self.amount;
        }
        self
    }

    pub fn with_entry_date(mut self, entry_date: NaiveDate) -> Self {
        self.entry_date = Some(entry_date);
        self
    }

    pub fn with_funds_code(mut self, funds_code: char) -> Self {
        self.funds_code = Some(funds_code);
        self
    }

    pub fn with_transaction_type(mut self, transaction_type: &str) -> Self {
        self.transaction_type = transaction_type.to_string();
        self
    }

    pub fn with_reference(mut self, reference: &str) -> Self {
        self.reference = reference.to_string();
        self
    }

    pub fn with_bank_reference(mut self, bank_reference: &str) -> Self {
        self.bank_reference = Some(bank_reference.to_string());
        self
    }

    pub fn with_extra_details(mut self, extra_details: &str) -> Self {
        self.extra_details = Some(extra_details.to_string());
        self
    }

    fn render(&self) -> String {
        let mut out = self.value_date.format("%y%m%d").to_string();
        if let Some(entry_date) = self.entry_date {
            out.push_str(&entry_date.format("%m%d").to_string());
        }
        if self.is_reversal {
            out.push('R');
        }
        out.push(self.direction.mark());
        if let Some(code) = self.funds_code {
            out.push(code);
        }
        out.push_str(&format_mt940_amount(self.amount));
        out.push_str(&self.transaction_type);
        out.push_str(&self.reference);
        if let Some(bank_ref) = &self.bank_reference {
            out.push_str("//");
            out.push_str(bank_ref);
        }
        if let Some(extra) = &self.extra_details {
            out.push('\n');
            out.push_str(extra);
        }
        out
    }
}

fn render_balance(balance: &Balance) -> String {
    format!(
        "{}{}{}{}",
        balance.direction().mark(),
        balance.date.format("%y%m%d"),
        balance.currency,
        format_mt940_amount(balance.amount),
    )
}

impl Tag {
    /// Тег с явным id и исходным текстом
    pub fn new(id: impl Into<String>, data: impl Into<String>, fields: TagFields) -> Self {
        Tag {
            id: id.into(),
            data: data.into(),
            fields,
        }
    }

    /// Заменяет синтезированный текст тега исходным
    pub fn with_data(mut self, data: impl Into<String>) -> Self {
        self.data = data.into();
        self
    }

    pub fn transaction_reference(reference: &str) -> Self {
        Tag::new(
            "20",
            reference,
            TagFields::TransactionReference {
                reference: reference.to_string(),
            },
        )
    }

    pub fn related_reference(reference: &str) -> Self {
        Tag::new(
            "21",
            reference,
            TagFields::RelatedReference {
                reference: reference.to_string(),
            },
        )
    }

    pub fn account_identification(account: &str) -> Self {
        Tag::new(
            "25",
            account,
            TagFields::AccountIdentification {
                account: account.to_string(),
            },
        )
    }

    pub fn statement_number(statement: u32, sequence: Option<u32>) -> Self {
        let number = StatementNumber { statement, sequence };
        Tag::new("28C", number.to_string(), TagFields::StatementNumber(number))
    }

    pub fn opening_balance(balance: Balance) -> Self {
        Tag::new(
            "60F",
            render_balance(&balance),
            TagFields::OpeningBalance {
                balance,
                intermediate: false,
            },
        )
    }

    /// :60M:, промежуточный открывающий баланс
    pub fn intermediate_opening_balance(balance: Balance) -> Self {
        Tag::new(
            "60M",
            render_balance(&balance),
            TagFields::OpeningBalance {
                balance,
                intermediate: true,
            },
        )
    }

    pub fn closing_balance(balance: Balance) -> Self {
        Tag::new(
            "62F",
            render_balance(&balance),
            TagFields::ClosingBalance {
                balance,
                intermediate: false,
            },
        )
    }

    /// :62M:, промежуточный закрывающий баланс
    pub fn intermediate_closing_balance(balance: Balance) -> Self {
        Tag::new(
            "62M",
            render_balance(&balance),
            TagFields::ClosingBalance {
                balance,
                intermediate: true,
            },
        )
    }

    pub fn closing_available_balance(balance: Balance) -> Self {
        Tag::new(
            "64",
            render_balance(&balance),
            TagFields::ClosingAvailableBalance { balance },
        )
    }

    pub fn forward_available_balance(balance: Balance) -> Self {
        Tag::new(
            "65",
            render_balance(&balance),
            TagFields::ForwardAvailableBalance { balance },
        )
    }

    pub fn statement_line(line: StatementLine) -> Self {
        Tag::new("61", line.render(), TagFields::StatementLine(line))
    }

    pub fn transaction_details(details: &str) -> Self {
        Tag::new(
            "86",
            details,
            TagFields::TransactionDetails {
                details: details.to_string(),
            },
        )
    }

    pub fn non_swift(text: &str) -> Self {
        Tag::new(
            "NS",
            text,
            TagFields::NonSwift {
                text: text.to_string(),
            },
        )
    }

    pub fn kind(&self) -> TagKind {
        match &self.fields {
            TagFields::TransactionReference { .. } => TagKind::TransactionReference,
            TagFields::RelatedReference { .. } => TagKind::RelatedReference,
            TagFields::AccountIdentification { .. } => TagKind::AccountIdentification,
            TagFields::StatementNumber(_) => TagKind::StatementNumber,
            TagFields::OpeningBalance { .. } => TagKind::OpeningBalance,
            TagFields::ClosingBalance { .. } => TagKind::ClosingBalance,
            TagFields::ClosingAvailableBalance { .. } => TagKind::ClosingAvailableBalance,
            TagFields::ForwardAvailableBalance { .. } => TagKind::ForwardAvailableBalance,
            TagFields::StatementLine(_) => TagKind::StatementLine,
            TagFields::TransactionDetails { .. } => TagKind::TransactionDetails,
            TagFields::NonSwift { .. } => TagKind::NonSwift,
        }
    }

    /// Баланс тега, если тег балансовый (:60:, :62:, :64:, :65:)
    pub fn balance(&self) -> Option<&Balance> {
        match &self.fields {
            TagFields::OpeningBalance { balance, .. }
            | TagFields::ClosingBalance { balance, .. }
            | TagFields::ClosingAvailableBalance { balance }
            | TagFields::ForwardAvailableBalance { balance } => Some(balance),
            TagFields::TransactionReference { .. }
            | TagFields::RelatedReference { .. }
            | TagFields::AccountIdentification { .. }
            | TagFields::StatementNumber(_)
            | TagFields::StatementLine(_)
            | TagFields::TransactionDetails { .. }
            | TagFields::NonSwift { .. } => None,
        }
    }

    /// Знаковая сумма строки выписки, для остальных тегов `None`
    pub fn line_amount(&self) -> Option<Decimal> {
        match &self.fields {
            TagFields::StatementLine(line) => Some(line.amount),
            _ => None,
        }
    }
}
