// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Zone-keyed symbol table.
//!
//! A zone is a named scoping region: zone 0 holds global symbols, local
//! symbols (written with a leading `.`) live in the zone that was current at
//! their point of use. A symbol exists once it has been referenced; it is
//! defined once a value has been assigned to it.

use std::collections::HashMap;

/// Scoping region for symbols; zone 0 is global.
pub type Zone = u32;

/// The global zone.
pub const GLOBAL_ZONE: Zone = 0;

/// A symbol table entry.
#[derive(Debug, Clone, Default)]
pub struct Symbol {
    pub value: i64,
    pub defined: bool,
    pub usage: u32,
    pub force: u8,
}

/// Symbol table keyed by zone and name.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    map: HashMap<(Zone, String), Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an existing symbol.
    pub fn lookup(&self, zone: Zone, name: &str) -> Option<&Symbol> {
        self.map.get(&(zone, name.to_string()))
    }

    pub fn lookup_mut(&mut self, zone: Zone, name: &str) -> Option<&mut Symbol> {
        self.map.get_mut(&(zone, name.to_string()))
    }

    /// Find a symbol, creating an undefined entry if it does not exist yet.
    pub fn find_or_create(&mut self, zone: Zone, name: &str, force: u8) -> &mut Symbol {
        let entry = self
            .map
            .entry((zone, name.to_string()))
            .or_insert_with(Symbol::default);
        if force != 0 {
            entry.force = force;
        }
        entry
    }

    /// Assign a value, marking the symbol defined. Overwriting is permitted
    /// (loop counters are rewritten every iteration and every pass).
    pub fn set_value(&mut self, zone: Zone, name: &str, force: u8, value: i64) {
        let entry = self.find_or_create(zone, name, force);
        entry.value = value;
        entry.defined = true;
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Iterate entries in a stable order (zone, then name).
    pub fn sorted(&self) -> Vec<(&(Zone, String), &Symbol)> {
        let mut entries: Vec<_> = self.map.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }
}
