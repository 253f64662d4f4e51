//! Apps rules: declarative pre-map state for matching views, with per-rule
//! match limits whose counters follow the owning views' lifetimes.

use std::path::Path;

use crate::config::AppsRuleCfg;
use crate::error::Result;
use crate::pattern::{ClientPattern, PatternEnv};
use crate::rc::{self, InitUpdate};
use crate::state::view::{
    decor_mask_parse, AppsRuleCursor, View, FOCUS_PROTECT_DENY, FOCUS_PROTECT_GAIN,
    FOCUS_PROTECT_NONE, FOCUS_PROTECT_REFUSE,
};

#[must_use]
pub fn focus_protection_from_names(names: &[String]) -> u8 {
    let mut out = FOCUS_PROTECT_NONE;
    for name in names {
        match name.to_ascii_lowercase().as_str() {
            "gain" => out |= FOCUS_PROTECT_GAIN,
            "refuse" => out |= FOCUS_PROTECT_REFUSE,
            "deny" => out |= FOCUS_PROTECT_DENY,
            "none" => out = FOCUS_PROTECT_NONE,
            _ => {}
        }
    }
    out
}

pub struct AppsRule {
    pub pattern: ClientPattern,
    pub workspace: Option<i32>,
    pub sticky: Option<bool>,
    /// Jump to the rule's workspace on map instead of just assigning it.
    pub jump: bool,
    pub minimized: Option<bool>,
    pub maximized: Option<bool>,
    pub fullscreen: Option<bool>,
    pub decor_mask: Option<u32>,
    pub layer: Option<i32>,
    pub head: Option<i32>,
    pub icon_hidden: Option<bool>,
    pub focus_hidden: Option<bool>,
    pub focus_protection: u8,
    /// Zero means unlimited.
    pub match_limit: i32,
    pub match_count: i32,
}

impl AppsRule {
    #[must_use]
    pub fn from_cfg(cfg: &AppsRuleCfg) -> Self {
        AppsRule {
            pattern: ClientPattern::parse(&cfg.pattern),
            workspace: cfg.workspace,
            sticky: cfg.sticky,
            jump: cfg.jump.unwrap_or(false),
            minimized: cfg.minimized,
            maximized: cfg.maximized,
            fullscreen: cfg.fullscreen,
            decor_mask: cfg.decor.as_deref().and_then(decor_mask_parse),
            layer: cfg.layer,
            head: cfg.head,
            icon_hidden: cfg.icon_hidden,
            focus_hidden: cfg.focus_hidden,
            focus_protection: focus_protection_from_names(&cfg.focus_protection),
            match_limit: cfg.match_limit,
            match_count: 0,
        }
    }

    /// A limited rule stops applying once its counter reaches the limit.
    #[must_use]
    pub fn applicable(&self) -> bool {
        self.match_limit <= 0 || self.match_count < self.match_limit
    }
}

#[derive(Default)]
pub struct AppsRules {
    rules: Vec<AppsRule>,
    generation: u64,
}

impl AppsRules {
    /// Replace the rule set; stale view cursors are invalidated by bumping
    /// the generation.
    pub fn rebuild(&mut self, cfgs: &[AppsRuleCfg]) {
        self.generation += 1;
        self.rules = cfgs.iter().map(AppsRule::from_cfg).collect();
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    #[must_use]
    pub fn rule(&self, index: usize) -> Option<&AppsRule> {
        self.rules.get(index)
    }

    /// First applicable rule matching the view, as a cursor the view keeps.
    #[must_use]
    pub fn find_match(&self, env: &PatternEnv, view: &View) -> Option<AppsRuleCursor> {
        self.rules
            .iter()
            .position(|r| r.applicable() && r.pattern.matches(env, view))
            .map(|index| AppsRuleCursor {
                index,
                generation: self.generation,
            })
    }

    fn cursor_rule_mut(&mut self, cursor: AppsRuleCursor) -> Option<&mut AppsRule> {
        if cursor.generation != self.generation {
            return None;
        }
        self.rules.get_mut(cursor.index)
    }

    pub fn match_count_inc(&mut self, cursor: AppsRuleCursor) {
        if let Some(rule) = self.cursor_rule_mut(cursor) {
            if rule.match_limit > 0 && rule.match_count < i32::MAX {
                rule.match_count += 1;
            }
        }
    }

    pub fn match_count_dec(&mut self, cursor: AppsRuleCursor) {
        if let Some(rule) = self.cursor_rule_mut(cursor) {
            if rule.match_limit > 0 && rule.match_count > 0 {
                rule.match_count -= 1;
            }
        }
    }

    /// Persist the match counters of limited rules with the same atomic
    /// rewrite the init file uses.
    pub fn save_match_counts(&self, path: &Path) -> Result<()> {
        let keys: Vec<(String, String)> = self
            .rules
            .iter()
            .enumerate()
            .filter(|(_, r)| r.match_limit > 0)
            .map(|(i, r)| (format!("rule{i}.matchCount"), r.match_count.to_string()))
            .collect();
        if keys.is_empty() {
            return Ok(());
        }
        let updates: Vec<InitUpdate> = keys
            .iter()
            .map(|(k, v)| InitUpdate { key: k, value: v })
            .collect();
        rc::update_file(path, &updates)
    }
}
