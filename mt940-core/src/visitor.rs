use crate::details::StructuredDetails;
use crate::error::BuildError;
use crate::model::{Balance, Currency, RawTag, Statement, StatementNumber, Transaction};
use crate::tags::{StatementLine, Tag, TagFields};
use log::{debug, warn};

/// Настройки сборки выписки
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildOptions {
    /// сохранять исходный текст тегов в выписке и проводках
    pub with_tags: bool,
    /// разбирать подполя :86: в [`StructuredDetails`]
    pub with_86_structure: bool,
}

/// Проводка в процессе сборки: :61: и всё, что к ней прицепилось
#[derive(Debug)]
struct PendingTransaction {
    line: StatementLine,
    details: Vec<String>,
    non_swift: Vec<String>,
    tags: Vec<RawTag>,
}

impl PendingTransaction {
    fn into_transaction(self, currency: &Currency, options: BuildOptions) -> Transaction {
        let PendingTransaction {
            line,
            details,
            non_swift,
            tags,
        } = self;

        let details = details.join("\n");
        let structured_details = (options.with_86_structure && !details.is_empty())
            .then(|| StructuredDetails::parse(&details));

        Transaction {
            value_date: line.value_date,
            entry_date: line.entry_date,
            amount: line.amount,
            is_reversal: line.is_reversal,
            currency: currency.clone(),
            transaction_type: line.transaction_type,
            reference: line.reference,
            bank_reference: line.bank_reference,
            funds_code: line.funds_code,
            extra_details: line.extra_details,
            details,
            structured_details,
            non_swift: (!non_swift.is_empty()).then(|| non_swift.join("\n")),
            tags: options.with_tags.then_some(tags),
        }
    }
}

/// Накопитель выписки: теги подаются по порядку через [`StatementVisitor::visit`],
/// результат забирается через [`StatementVisitor::into_statement`].
///
/// Ничего не проверяет: группа должна пройти [`crate::validate_group`] заранее.
#[derive(Debug, Default)]
pub struct StatementVisitor {
    options: BuildOptions,

    transaction_reference: Option<String>, // :20:
    related_reference: Option<String>,     // :21:
    account_id: Option<String>,            // :25:
    number: Option<StatementNumber>,       // :28C:

    opening_balance: Option<Balance>,           // :60:
    closing_balance: Option<Balance>,           // :62:
    closing_available_balance: Option<Balance>, // :64:
    forward_available_balances: Vec<Balance>,   // :65:

    information: Vec<String>,
    transactions: Vec<PendingTransaction>,
    tags: Vec<RawTag>,

    /// последняя :61: ещё принимает :86: и NS
    line_open: bool,
}

/// Запоминает первое значение, повторы пишутся в лог и отбрасываются
fn keep_first<T>(slot: &mut Option<T>, value: T, tag_id: &str) {
    if slot.is_none() {
        *slot = Some(value);
    } else {
        warn!("multiple :{tag_id}: tags in one statement, keeping the first one");
    }
}

impl StatementVisitor {
    pub fn new(options: BuildOptions) -> Self {
        StatementVisitor {
            options,
            ..Default::default()
        }
    }

    /// Применяет один тег к накопленному состоянию
    pub fn visit(&mut self, tag: &Tag) {
        match &tag.fields {
            TagFields::TransactionReference { reference } => {
                keep_first(&mut self.transaction_reference, reference.clone(), &tag.id);
            }
            TagFields::RelatedReference { reference } => {
                keep_first(&mut self.related_reference, reference.clone(), &tag.id);
            }
            TagFields::AccountIdentification { account } => {
                keep_first(&mut self.account_id, account.clone(), &tag.id);
            }
            TagFields::StatementNumber(number) => {
                keep_first(&mut self.number, *number, &tag.id);
            }
            TagFields::OpeningBalance { balance, .. } => {
                keep_first(&mut self.opening_balance, balance.clone(), &tag.id);
            }
            TagFields::ClosingBalance { balance, .. } => {
                keep_first(&mut self.closing_balance, balance.clone(), &tag.id);
            }
            TagFields::ClosingAvailableBalance { balance } => {
                keep_first(&mut self.closing_available_balance, balance.clone(), &tag.id);
            }
            TagFields::ForwardAvailableBalance { balance } => {
                self.forward_available_balances.push(balance.clone());
            }
            TagFields::StatementLine(line) => {
                self.transactions.push(PendingTransaction {
                    line: line.clone(),
                    details: Vec::new(),
                    non_swift: Vec::new(),
                    tags: Vec::new(),
                });
                self.line_open = true;
                self.remember_line_tag(tag);
                return;
            }
            TagFields::TransactionDetails { details } => {
                if let Some(current) = self.open_transaction() {
                    current.details.push(details.clone());
                    self.remember_line_tag(tag);
                } else {
                    self.information.push(details.clone());
                    self.remember_statement_tag(tag);
                }
                return;
            }
            TagFields::NonSwift { text } => {
                if let Some(current) = self.open_transaction() {
                    current.non_swift.push(text.clone());
                    self.remember_line_tag(tag);
                } else {
                    debug!("NS tag outside of a statement line dropped: {text}");
                }
                return;
            }
        }

        // любой тег уровня выписки закрывает текущую проводку
        self.line_open = false;
        self.remember_statement_tag(tag);
    }

    fn open_transaction(&mut self) -> Option<&mut PendingTransaction> {
        if self.line_open {
            self.transactions.last_mut()
        } else {
            None
        }
    }

    fn remember_statement_tag(&mut self, tag: &Tag) {
        if self.options.with_tags {
            self.tags.push(raw_tag(tag));
        }
    }

    fn remember_line_tag(&mut self, tag: &Tag) {
        if !self.options.with_tags {
            return;
        }
        if let Some(current) = self.transactions.last_mut() {
            current.tags.push(raw_tag(tag));
        }
    }

    /// Собирает выписку из накопленного состояния.
    ///
    /// Ошибка возможна только если группа не проходила проверку.
    pub fn into_statement(self) -> Result<Statement, BuildError> {
        let StatementVisitor {
            options,
            transaction_reference,
            related_reference,
            account_id,
            number,
            opening_balance,
            closing_balance,
            closing_available_balance,
            forward_available_balances,
            information,
            transactions,
            tags,
            line_open: _,
        } = self;

        let transaction_reference =
            transaction_reference.ok_or(BuildError::Incomplete("transaction reference"))?;
        let account_id = account_id.ok_or(BuildError::Incomplete("account identification"))?;
        let number = number.ok_or(BuildError::Incomplete("statement number"))?;
        let opening_balance = opening_balance.ok_or(BuildError::Incomplete("opening balance"))?;
        let closing_balance = closing_balance.ok_or(BuildError::Incomplete("closing balance"))?;

        let currency = opening_balance.currency.clone();

        let transactions = transactions
            .into_iter()
            .map(|pending| pending.into_transaction(&currency, options))
            .collect();

        Ok(Statement {
            transaction_reference,
            related_reference,
            account_id,
            number,
            currency,
            opening_balance,
            closing_balance,
            closing_available_balance,
            forward_available_balances,
            information_to_account_owner: (!information.is_empty()).then(|| information.join("\n")),
            transactions,
            tags: options.with_tags.then_some(tags),
        })
    }
}

fn raw_tag(tag: &Tag) -> RawTag {
    RawTag {
        id: tag.id.clone(),
        data: tag.data.clone(),
    }
}

/// Собирает выписку из проверенной группы тегов.
///
/// Теги обходятся в исходном порядке, проводки в выписке идут в том же порядке.
/// Группу нужно сначала проверить через [`crate::validate_group`]: сборщик сам
/// ничего не проверяет и на некорректной группе даст бессмысленную выписку
/// (или [`BuildError`], если не хватает обязательного поля).
pub fn build_statement(group: &[Tag], options: BuildOptions) -> Result<Statement, BuildError> {
    let mut visitor = StatementVisitor::new(options);
    for tag in group {
        visitor.visit(tag);
    }

    let statement = visitor.into_statement()?;
    debug!(
        "statement {} for account {}: {} transactions",
        statement.transaction_reference,
        statement.account_id,
        statement.transactions.len()
    );
    Ok(statement)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Direction;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 1, d).unwrap()
    }

    fn usd(amount: Decimal) -> Balance {
        Balance::new(Direction::Credit, date(1), "USD".parse().unwrap(), amount)
    }

    fn line(direction: Direction, amount: Decimal, reference: &str) -> Tag {
        Tag::statement_line(
            StatementLine::new(date(2), direction, amount).with_reference(reference),
        )
    }

    fn sample_group() -> Vec<Tag> {
        vec![
            Tag::transaction_reference("REF1"),
            Tag::related_reference("REL1"),
            Tag::account_identification("ACC1"),
            Tag::statement_number(1, Some(2)),
            Tag::opening_balance(usd(dec!(100.00))),
            line(Direction::Credit, dec!(50.00), "L1"),
            Tag::transaction_details("?20first?32ACME"),
            Tag::non_swift("bank note"),
            line(Direction::Debit, dec!(20.00), "L2"),
            Tag::closing_balance(usd(dec!(130.00))),
            Tag::closing_available_balance(usd(dec!(130.00))),
            Tag::forward_available_balance(usd(dec!(130.00))),
            Tag::forward_available_balance(usd(dec!(125.00))),
            Tag::transaction_details("Statement note"),
        ]
    }

    #[test]
    fn builds_all_statement_fields() {
        let stmt = build_statement(&sample_group(), BuildOptions::default()).unwrap();

        assert_eq!(stmt.transaction_reference, "REF1");
        assert_eq!(stmt.related_reference.as_deref(), Some("REL1"));
        assert_eq!(stmt.account_id, "ACC1");
        assert_eq!(stmt.number, StatementNumber { statement: 1, sequence: Some(2) });
        assert_eq!(stmt.currency.code(), "USD");
        assert_eq!(stmt.opening_balance.amount, dec!(100.00));
        assert_eq!(stmt.closing_balance.amount, dec!(130.00));
        assert_eq!(stmt.closing_available_balance, Some(usd(dec!(130.00))));
        assert_eq!(stmt.forward_available_balances, vec![usd(dec!(130.00)), usd(dec!(125.00))]);
        assert_eq!(stmt.information_to_account_owner.as_deref(), Some("Statement note"));
        assert!(stmt.tags.is_none());
    }

    #[test]
    fn details_and_non_swift_attach_to_preceding_line() {
        let stmt = build_statement(&sample_group(), BuildOptions::default()).unwrap();

        assert_eq!(stmt.transactions.len(), 2);

        let first = &stmt.transactions[0];
        assert_eq!(first.reference, "L1");
        assert_eq!(first.amount, dec!(50.00));
        assert_eq!(first.currency.code(), "USD");
        assert_eq!(first.details, "?20first?32ACME");
        assert_eq!(first.non_swift.as_deref(), Some("bank note"));
        assert!(first.structured_details.is_none());
        assert!(first.tags.is_none());

        let second = &stmt.transactions[1];
        assert_eq!(second.reference, "L2");
        assert_eq!(second.amount, dec!(-20.00));
        assert!(second.is_expense());
        assert_eq!(second.details, "");
        assert!(second.non_swift.is_none());
    }

    #[test]
    fn repeated_details_are_joined() {
        let mut group = sample_group();
        group.insert(7, Tag::transaction_details("second part"));

        let stmt = build_statement(&group, BuildOptions::default()).unwrap();
        assert_eq!(stmt.transactions[0].details, "?20first?32ACME\nsecond part");
    }

    #[test]
    fn with_86_structure_parses_details() {
        let options = BuildOptions {
            with_86_structure: true,
            ..Default::default()
        };
        let stmt = build_statement(&sample_group(), options).unwrap();

        let structured = stmt.transactions[0].structured_details.as_ref().unwrap();
        assert_eq!(structured.get("20"), Some("first"));
        assert_eq!(structured.get("32"), Some("ACME"));

        // без :86: разбирать нечего
        assert!(stmt.transactions[1].structured_details.is_none());
    }

    #[test]
    fn with_tags_keeps_raw_text() {
        let options = BuildOptions {
            with_tags: true,
            ..Default::default()
        };
        let stmt = build_statement(&sample_group(), options).unwrap();

        let statement_ids: Vec<&str> = stmt
            .tags
            .as_ref()
            .unwrap()
            .iter()
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(
            statement_ids,
            ["20", "21", "25", "28C", "60F", "62F", "64", "65", "65", "86"]
        );

        let first_ids: Vec<&str> = stmt.transactions[0]
            .tags
            .as_ref()
            .unwrap()
            .iter()
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(first_ids, ["61", "86", "NS"]);

        let second = stmt.transactions[1].tags.as_ref().unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].data, "230102D20,00NTRFL2");
    }

    #[test]
    fn transactions_keep_source_order() {
        let mut group = vec![
            Tag::transaction_reference("REF1"),
            Tag::account_identification("ACC1"),
            Tag::statement_number(1, None),
            Tag::opening_balance(usd(dec!(0))),
        ];
        for (idx, amount) in [dec!(3), dec!(1), dec!(2)].into_iter().enumerate() {
            group.push(line(Direction::Credit, amount, &format!("L{}", idx + 1)));
        }
        group.push(Tag::closing_balance(usd(dec!(6))));

        let stmt = build_statement(&group, BuildOptions::default()).unwrap();

        let refs: Vec<&str> = stmt.transactions.iter().map(|t| t.reference.as_str()).collect();
        assert_eq!(refs, ["L1", "L2", "L3"]);
    }

    #[test]
    fn duplicate_balances_keep_first() {
        let mut group = sample_group();
        group.push(Tag::intermediate_closing_balance(usd(dec!(1.00))));

        let stmt = build_statement(&group, BuildOptions::default()).unwrap();
        assert_eq!(stmt.closing_balance.amount, dec!(130.00));
    }

    #[test]
    fn stray_non_swift_is_dropped() {
        let mut group = sample_group();
        group.insert(4, Tag::non_swift("before lines"));

        let stmt = build_statement(&group, BuildOptions::default()).unwrap();
        assert_eq!(stmt.transactions[0].non_swift.as_deref(), Some("bank note"));
    }

    #[test]
    fn incomplete_group_fails_on_finalization() {
        let group = vec![
            Tag::transaction_reference("REF1"),
            Tag::account_identification("ACC1"),
            Tag::statement_number(1, None),
            Tag::closing_balance(usd(dec!(1))),
        ];

        assert_eq!(
            build_statement(&group, BuildOptions::default()),
            Err(BuildError::Incomplete("opening balance"))
        );
    }

    #[test]
    fn building_is_repeatable() {
        let group = sample_group();
        let options = BuildOptions {
            with_tags: true,
            with_86_structure: true,
        };
        assert_eq!(build_statement(&group, options), build_statement(&group, options));
    }
}
