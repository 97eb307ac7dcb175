use crate::model::Currency;
use crate::tags::TagKind;
use rust_decimal::Decimal;
use thiserror::Error;

/// Ошибки проверки группы тегов.
///
/// Проверка останавливается на первом нарушении, поэтому ошибка всегда одна.
/// `group` - номер группы в сообщении (с единицы).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// в группе нет обязательного тега
    #[error("mandatory tag {kind} is missing in group {group}")]
    MissingMandatoryTag { kind: TagKind, group: usize },

    /// балансы группы в разных валютах
    #[error("currency markers differ [{}] in group {group}", join_currencies(.currencies))]
    CurrencyMismatch {
        currencies: Vec<Currency>,
        group: usize,
    },

    /// сумма проводок не сходится с разницей закрывающего и открывающего балансов
    #[error("sum of lines ({sum_lines}) != turnover ({turnover}) in group {group}")]
    TurnoverMismatch {
        sum_lines: Decimal,
        turnover: Decimal,
        group: usize,
    },
}

fn join_currencies(currencies: &[Currency]) -> String {
    currencies
        .iter()
        .map(Currency::code)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Ошибка сборки выписки: после обхода не хватает обязательного поля.
///
/// На проверенной группе не возникает.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("statement is incomplete: no {0}")]
    Incomplete(&'static str),
}

/// Общая ошибка библиотеки
#[derive(Debug, Error)]
pub enum Mt940Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Build(#[from] BuildError),

    /// код валюты не из трёх латинских букв
    #[error("invalid currency: '{0}'")]
    InvalidCurrency(String),

    #[error("0 statement groups detected")]
    NoStatements,
}
