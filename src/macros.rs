// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Registry of captured macro bodies.
//!
//! Bodies are registered once, during the defining pass, and looked up by
//! zone and name. The registry owns the captured text.

use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{AsmError, AsmErrorKind};
use crate::symbol::Zone;

/// A named macro body captured from source.
#[derive(Debug, Clone)]
pub struct MacroDef {
    pub zone: Zone,
    pub name: String,
    /// Line of the opening block delimiter, for re-parse line numbering.
    pub line: u32,
    /// Captured body text, end-of-statement sentinel included.
    pub body: Rc<[u8]>,
}

/// Macro registry keyed by zone and name.
#[derive(Debug, Default)]
pub struct MacroRegistry {
    map: HashMap<(Zone, String), MacroDef>,
}

impl MacroRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a macro body. Redefinition is an error.
    pub fn add(&mut self, def: MacroDef) -> Result<(), AsmError> {
        let key = (def.zone, def.name.clone());
        if self.map.contains_key(&key) {
            return Err(AsmError::new(
                AsmErrorKind::Macro,
                "Macro already defined",
                Some(&def.name),
            ));
        }
        self.map.insert(key, def);
        Ok(())
    }

    pub fn get(&self, zone: Zone, name: &str) -> Option<&MacroDef> {
        self.map.get(&(zone, name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
