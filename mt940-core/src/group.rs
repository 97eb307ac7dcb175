use crate::error::Mt940Error;
use crate::model::Statement;
use crate::tags::{Tag, TagKind};
use crate::validation::validate_group;
use crate::visitor::{BuildOptions, build_statement};
use log::{debug, info};

/// Делит поток тегов на группы по выпискам.
///
/// Новая группа начинается с каждого :20:. Теги до первого :20: образуют
/// отдельную группу (она потом не пройдёт проверку без :20:).
pub fn split_groups(tags: &[Tag]) -> Vec<&[Tag]> {
    let mut groups: Vec<&[Tag]> = Vec::new();
    let mut start = 0;

    for (idx, tag) in tags.iter().enumerate() {
        if tag.kind() == TagKind::TransactionReference && idx > start {
            groups.push(&tags[start..idx]);
            start = idx;
        }
    }

    if start < tags.len() {
        groups.push(&tags[start..]);
    }

    groups
}

/// Делит теги на группы, проверяет каждую и собирает выписки.
///
/// Группы нумеруются с единицы; первая некорректная группа прерывает разбор.
///
/// Пример:
/// ```rust,no_run
/// use mt940_core::{BuildOptions, Tag, read_statements};
/// # use mt940_core::Mt940Error;
/// # fn main() -> Result<(), Mt940Error> {
/// let tags: Vec<Tag> = Vec::new(); // теги от токенизатора
/// let statements = read_statements(&tags, BuildOptions::default())?;
/// #     Ok(())
/// # }
/// ```
pub fn read_statements(tags: &[Tag], options: BuildOptions) -> Result<Vec<Statement>, Mt940Error> {
    let groups = split_groups(tags);
    if groups.is_empty() {
        return Err(Mt940Error::NoStatements);
    }
    debug!("{} tags split into {} groups", tags.len(), groups.len());

    let mut statements = Vec::with_capacity(groups.len());
    for (idx, group) in groups.into_iter().enumerate() {
        validate_group(group, idx + 1)?;
        statements.push(build_statement(group, options)?);
    }

    info!("{} statements assembled", statements.len());
    Ok(statements)
}
