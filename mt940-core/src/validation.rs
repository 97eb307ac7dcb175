use crate::amount;
use crate::error::ValidationError;
use crate::model::{Balance, Currency};
use crate::tags::{Tag, TagFields, TagKind};
use log::debug;
use rust_decimal::Decimal;

/// Обязательные теги в порядке проверки
const MANDATORY_TAGS: [TagKind; 5] = [
    TagKind::TransactionReference, // :20:
    TagKind::AccountIdentification, // :25:
    TagKind::StatementNumber, // :28C:
    TagKind::OpeningBalance, // :60:
    TagKind::ClosingBalance, // :62:
];

/// Проверяет, что группа тегов образует корректную выписку.
///
/// Порядок проверок фиксирован, возвращается первое нарушение:
/// 1. есть все обязательные теги (повторы не проверяются);
/// 2. все балансовые теги (:60:, :62:, :64:, :65:) в одной валюте;
/// 3. сумма строк :61: равна разнице первых :62: и :60: с точностью [`amount::EPSILON`].
///
/// Группа не изменяется; повторный вызов даёт тот же результат.
pub fn validate_group(group: &[Tag], group_number: usize) -> Result<(), ValidationError> {
    for kind in MANDATORY_TAGS {
        if !group.iter().any(|tag| tag.kind() == kind) {
            return Err(ValidationError::MissingMandatoryTag {
                kind,
                group: group_number,
            });
        }
    }

    check_currency(group, group_number)?;
    check_turnover(group, group_number)?;

    debug!("group {group_number}: {} tags are consistent", group.len());
    Ok(())
}

fn check_currency(group: &[Tag], group_number: usize) -> Result<(), ValidationError> {
    let mut currency: Option<&Currency> = None;

    for balance in group.iter().filter_map(Tag::balance) {
        match currency {
            None => currency = Some(&balance.currency),
            Some(first) if *first != balance.currency => {
                return Err(ValidationError::CurrencyMismatch {
                    currencies: vec![first.clone(), balance.currency.clone()],
                    group: group_number,
                });
            }
            Some(_) => {}
        }
    }

    Ok(())
}

fn check_turnover(group: &[Tag], group_number: usize) -> Result<(), ValidationError> {
    let opening = first_balance(group, TagKind::OpeningBalance, group_number)?;
    let closing = first_balance(group, TagKind::ClosingBalance, group_number)?;
    let turnover = closing.amount - opening.amount;

    let sum_lines: Decimal = group.iter().filter_map(Tag::line_amount).sum();

    if !amount::is_equal(sum_lines, turnover) {
        return Err(ValidationError::TurnoverMismatch {
            sum_lines,
            turnover,
            group: group_number,
        });
    }

    Ok(())
}

/// Первый :60: или :62: группы
fn first_balance(
    group: &[Tag],
    kind: TagKind,
    group_number: usize,
) -> Result<&Balance, ValidationError> {
    group
        .iter()
        .find_map(|tag| match (&tag.fields, kind) {
            (TagFields::OpeningBalance { balance, .. }, TagKind::OpeningBalance)
            | (TagFields::ClosingBalance { balance, .. }, TagKind::ClosingBalance) => Some(balance),
            _ => None,
        })
        .ok_or(ValidationError::MissingMandatoryTag {
            kind,
            group: group_number,
        })
}
