//! Deterministic SQL alias generation for one translation pass.
//!
//! Table aliases are memoized per (table, scope) key so every reference to
//! the same table under the same identification variable gets the same
//! alias. Column aliases are always fresh. Both draw from counters owned by
//! the allocator, so identical inputs produce identical SQL.

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Characters that may not appear in a column alias
static NON_ALIAS_CHARS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^A-Za-z0-9_]").expect("alias sanitizing pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableAliasStyle {
    /// First letter of the table name, counter, underscore: `u0_`
    TableInitial,
    /// Fixed prefix and counter: `t0`
    Fixed(&'static str),
}

#[derive(Debug, Clone)]
pub struct AliasAllocator {
    style: TableAliasStyle,
    table_aliases: HashMap<String, String>,
    table_alias_counter: usize,
    column_alias_counter: usize,
    max_identifier_length: usize,
}

impl AliasAllocator {
    pub fn new(style: TableAliasStyle, max_identifier_length: usize) -> Self {
        AliasAllocator {
            style,
            table_aliases: HashMap::new(),
            table_alias_counter: 0,
            column_alias_counter: 0,
            max_identifier_length,
        }
    }

    /// Alias for `table_name` under `scope` (usually an identification
    /// variable). Repeated calls with the same key return the same alias.
    pub fn table_alias(&mut self, table_name: &str, scope: &str) -> String {
        let key = format!("{}#{}", table_name, scope);
        if let Some(alias) = self.table_aliases.get(&key) {
            return alias.clone();
        }

        let alias = match self.style {
            TableAliasStyle::TableInitial => {
                let initial = table_name
                    .chars()
                    .rev()
                    .take_while(|c| *c != '.')
                    .last()
                    .filter(|c| c.is_ascii_alphabetic())
                    .map(|c| c.to_ascii_lowercase())
                    .unwrap_or('t');
                format!("{}{}_", initial, self.table_alias_counter)
            }
            TableAliasStyle::Fixed(prefix) => format!("{}{}", prefix, self.table_alias_counter),
        };
        self.table_alias_counter += 1;
        self.table_aliases.insert(key, alias.clone());
        alias
    }

    /// Forces `alias` for a (table, scope) key, used when a caller supplies
    /// its own alias.
    pub fn set_table_alias(&mut self, table_name: &str, scope: &str, alias: &str) {
        self.table_aliases
            .insert(format!("{}#{}", table_name, scope), alias.to_string());
    }

    /// Fresh alias for a result column: `{column}_{n}`, truncated from the
    /// front, stripped to `[A-Za-z0-9_]`, never starting with a digit.
    pub fn column_alias(&mut self, column_name: &str) -> String {
        let raw = format!("{}_{}", column_name, self.column_alias_counter);
        self.column_alias_counter += 1;
        self.finish_column_alias(&raw)
    }

    /// Fresh alias for a computed scalar: `sclr_{n}`
    pub fn scalar_alias(&mut self) -> String {
        let raw = format!("sclr_{}", self.column_alias_counter);
        self.column_alias_counter += 1;
        self.finish_column_alias(&raw)
    }

    fn finish_column_alias(&self, raw: &str) -> String {
        let sanitized = NON_ALIAS_CHARS.replace_all(raw, "").into_owned();
        let max = self.max_identifier_length.max(2);
        let mut alias = keep_tail(&sanitized, max);
        if alias.chars().next().map_or(false, |c| c.is_ascii_digit()) {
            alias = format!("_{}", keep_tail(&alias, max - 1));
        }
        alias
    }
}

fn keep_tail(s: &str, max: usize) -> String {
    let len = s.chars().count();
    if len <= max {
        s.to_string()
    } else {
        s.chars().skip(len - max).collect()
    }
}
