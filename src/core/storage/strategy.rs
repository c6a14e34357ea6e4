use crate::core::entities::AttributeValue;
use crate::core::events::StorageEvent;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// Extra parameters a consumer passes along with a release request
pub type ReleaseParams = BTreeMap<String, AttributeValue>;

/// Custom release selection: index of the entry to release, or `None` if no
/// entry suits this consumer.
pub type ReleaseFn = dyn Fn(&[StorageEvent], &ReleaseParams) -> Option<usize>;

/// Which queued entry a release takes
#[derive(Clone, Default)]
pub enum ReleaseStrategy {
    /// Oldest entry first
    #[default]
    Fifo,
    /// Newest entry first
    Lifo,
    Custom(Rc<ReleaseFn>),
}

impl ReleaseStrategy {
    pub fn custom<F>(select: F) -> Self
    where
        F: Fn(&[StorageEvent], &ReleaseParams) -> Option<usize> + 'static,
    {
        ReleaseStrategy::Custom(Rc::new(select))
    }

    /// Pick an entry. Never mutates the entries.
    pub fn select(&self, entries: &[StorageEvent], params: &ReleaseParams) -> Option<usize> {
        match self {
            ReleaseStrategy::Fifo => fifo(entries, params),
            ReleaseStrategy::Lifo => lifo(entries, params),
            ReleaseStrategy::Custom(select) => select(entries, params),
        }
    }
}

impl fmt::Debug for ReleaseStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReleaseStrategy::Fifo => f.write_str("Fifo"),
            ReleaseStrategy::Lifo => f.write_str("Lifo"),
            ReleaseStrategy::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

pub fn fifo(entries: &[StorageEvent], _params: &ReleaseParams) -> Option<usize> {
    if entries.is_empty() {
        None
    } else {
        Some(0)
    }
}

pub fn lifo(entries: &[StorageEvent], _params: &ReleaseParams) -> Option<usize> {
    entries.len().checked_sub(1)
}

/// Parameter key read by [`by_entity_type`]
pub const ENTITY_TYPE_PARAM: &str = "entity_type";
/// Parameter key naming the attribute [`by_priority_attribute`] ranks on
pub const PRIORITY_ATTRIBUTE_PARAM: &str = "attribute";
pub const DEFAULT_PRIORITY_ATTRIBUTE: &str = "priority";

/// Oldest entry of the type named by the `entity_type` parameter. Falls back
/// to FIFO when the parameter is absent.
pub fn by_entity_type(entries: &[StorageEvent], params: &ReleaseParams) -> Option<usize> {
    match params.get(ENTITY_TYPE_PARAM).and_then(AttributeValue::as_str) {
        Some(wanted) => entries.iter().position(|entry| entry.entity_type() == wanted),
        None => fifo(entries, params),
    }
}

/// Entry with the highest numeric priority attribute; oldest wins ties.
/// Entries without the attribute rank below every entry that has it.
pub fn by_priority_attribute(entries: &[StorageEvent], params: &ReleaseParams) -> Option<usize> {
    let key = params
        .get(PRIORITY_ATTRIBUTE_PARAM)
        .and_then(AttributeValue::as_str)
        .unwrap_or(DEFAULT_PRIORITY_ATTRIBUTE);

    let mut best: Option<(usize, f64)> = None;
    for (index, entry) in entries.iter().enumerate() {
        let Some(priority) = entry.attribute(key).and_then(|v| v.as_f64()) else {
            continue;
        };
        match best {
            Some((_, current)) if priority <= current => {}
            _ => best = Some((index, priority)),
        }
    }

    best.map(|(index, _)| index).or_else(|| fifo(entries, params))
}
