use rust_decimal::Decimal;

/// Допуск при сравнении сумм: 1e-9 денежной единицы
pub const EPSILON: Decimal = Decimal::from_parts(1, 0, 0, false, 9);

/// Сравнивает суммы с допуском [`EPSILON`].
///
/// Используется при сверке оборота с суммой проводок, чтобы не зависеть от
/// погрешности разбора десятичных строк на стороне токенизатора.
pub fn is_equal(a: Decimal, b: Decimal) -> bool {
    (a - b).abs() < EPSILON
}

/// Форматирует сумму без знака так, как она записывается в MT940: "1234,56", "100,"
pub(crate) fn format_mt940_amount(amount: Decimal) -> String {
    let text = amount.abs().to_string();
    match text.split_once('.') {
        Some((units, frac)) => format!("{units},{frac}"),
        None => format!("{text},"),
    }
}
