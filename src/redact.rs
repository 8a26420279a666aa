//! Redaction of identifying strings in raw snapshots.
//!
//! Fields can be cleared or replaced by pseudonyms. Pseudonyms are stable
//! for the lifetime of a [`Redactor`]: a value always maps to the same
//! pseudonym, and distinct values map to distinct pseudonyms, so pairing and
//! grouping behave exactly as on the original names.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use topowatch_types::RawSnapshot;

use crate::error::RedactError;

/// A redactable string field of the raw records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedactField {
    Hname,
    Pname,
    Uname,
    Tname,
    Sname,
}

impl RedactField {
    pub fn as_str(&self) -> &'static str {
        match self {
            RedactField::Hname => "hname",
            RedactField::Pname => "pname",
            RedactField::Uname => "uname",
            RedactField::Tname => "tname",
            RedactField::Sname => "sname",
        }
    }

    /// Fields that key or pair records. Clearing them would merge or drop records.
    pub fn is_identity(&self) -> bool {
        matches!(
            self,
            RedactField::Hname | RedactField::Tname | RedactField::Sname
        )
    }
}

impl fmt::Display for RedactField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RedactField {
    type Err = RedactError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "hname" => Ok(RedactField::Hname),
            "pname" => Ok(RedactField::Pname),
            "uname" => Ok(RedactField::Uname),
            "tname" => Ok(RedactField::Tname),
            "sname" => Ok(RedactField::Sname),
            other => Err(RedactError::UnknownField(other.to_string())),
        }
    }
}

/// Applies clear and pseudonymize rules to raw snapshots.
#[derive(Debug, Clone, Default)]
pub struct Redactor {
    clear: BTreeSet<RedactField>,
    pseudonymize: BTreeSet<RedactField>,
    pseudonyms: BTreeMap<RedactField, BTreeMap<String, String>>,
    originals: BTreeMap<RedactField, BTreeMap<String, String>>,
}

impl Redactor {
    pub fn new(
        clear: impl IntoIterator<Item = RedactField>,
        pseudonymize: impl IntoIterator<Item = RedactField>,
    ) -> Result<Self, RedactError> {
        let clear: BTreeSet<RedactField> = clear.into_iter().collect();
        if let Some(field) = clear.iter().find(|f| f.is_identity()) {
            return Err(RedactError::IdentityCleared(*field));
        }
        let pseudonymize = pseudonymize
            .into_iter()
            .filter(|f| !clear.contains(f))
            .collect();
        Ok(Self {
            clear,
            pseudonymize,
            pseudonyms: BTreeMap::new(),
            originals: BTreeMap::new(),
        })
    }

    /// True when no rule is configured.
    pub fn is_noop(&self) -> bool {
        self.clear.is_empty() && self.pseudonymize.is_empty()
    }

    /// Redact every configured field of every record in place.
    pub fn apply(&mut self, snapshot: &mut RawSnapshot) {
        if self.is_noop() {
            return;
        }
        for p in &mut snapshot.processes {
            self.redact(RedactField::Hname, &mut p.hname);
            self.redact(RedactField::Pname, &mut p.pname);
            self.redact(RedactField::Uname, &mut p.uname);
        }
        for t in &mut snapshot.topics {
            self.redact(RedactField::Hname, &mut t.hname);
            self.redact(RedactField::Pname, &mut t.pname);
            self.redact(RedactField::Uname, &mut t.uname);
            self.redact(RedactField::Tname, &mut t.tname);
        }
        for s in &mut snapshot.services {
            self.redact(RedactField::Hname, &mut s.hname);
            self.redact(RedactField::Pname, &mut s.pname);
            self.redact(RedactField::Uname, &mut s.uname);
            self.redact(RedactField::Sname, &mut s.sname);
        }
        for c in &mut snapshot.clients {
            self.redact(RedactField::Hname, &mut c.hname);
            self.redact(RedactField::Pname, &mut c.pname);
            self.redact(RedactField::Uname, &mut c.uname);
            self.redact(RedactField::Sname, &mut c.sname);
        }
    }

    fn redact(&mut self, field: RedactField, value: &mut Option<String>) {
        let Some(original) = value.as_mut() else {
            return;
        };
        if self.clear.contains(&field) {
            original.clear();
        } else if self.pseudonymize.contains(&field) {
            *original = self.pseudonym(field, original);
        }
    }

    /// The pseudonym of `value` in `field`, allocating one on first sight.
    pub fn pseudonym(&mut self, field: RedactField, value: &str) -> String {
        let table = self.pseudonyms.entry(field).or_default();
        if let Some(existing) = table.get(value) {
            return existing.clone();
        }
        let alias = format!("{}-{}", field, table.len() + 1);
        table.insert(value.to_string(), alias.clone());
        self.originals
            .entry(field)
            .or_default()
            .insert(alias.clone(), value.to_string());
        alias
    }

    /// The value `alias` was allocated for, if it is a pseudonym of `field`.
    pub fn original(&self, field: RedactField, alias: &str) -> Option<&str> {
        self.originals
            .get(&field)
            .and_then(|table| table.get(alias))
            .map(String::as_str)
    }
}
