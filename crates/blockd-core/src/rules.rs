//! Blocking decisions and the installed rule set
//!
//! A domain is blocked when it is individually blocked, or in the focus set
//! while focus mode is active, and it has no valid temporary access.

use blockd_api::{BlockReason, BlockRule, RuleSet};
use blockd_host_api::BlockedPage;
use blockd_util::Domain;
use std::collections::BTreeSet;
use tracing::debug;

/// Everything a blocking decision depends on
#[derive(Debug, Clone, Copy)]
pub struct BlockingInputs<'a> {
    pub blocked: &'a BTreeSet<Domain>,
    pub focus_domains: &'a BTreeSet<Domain>,
    pub focus_active: bool,
    /// Domains holding a valid temporary grant
    pub allowed: &'a BTreeSet<Domain>,
}

impl BlockingInputs<'_> {
    /// Why `domain` is blocked right now, if it is
    ///
    /// An individual block takes precedence over a focus block.
    pub fn block_reason(&self, domain: &Domain) -> Option<BlockReason> {
        if self.allowed.contains(domain) {
            None
        } else if self.blocked.contains(domain) {
            Some(BlockReason::Individual)
        } else if self.focus_active && self.focus_domains.contains(domain) {
            Some(BlockReason::Focus)
        } else {
            None
        }
    }

    pub fn is_blocked(&self, domain: &Domain) -> bool {
        self.block_reason(domain).is_some()
    }

    /// Blocked domains in order, each with its reason
    pub fn blocked_domains(&self) -> Vec<(Domain, BlockReason)> {
        let focus: &BTreeSet<Domain> = if self.focus_active {
            self.focus_domains
        } else {
            &EMPTY
        };

        self.blocked
            .union(focus)
            .filter_map(|d| self.block_reason(d).map(|r| (d.clone(), r)))
            .collect()
    }
}

static EMPTY: BTreeSet<Domain> = BTreeSet::new();

/// Turns blocking inputs into redirect rules
///
/// The generation only moves when the rules themselves change, so recomputing
/// without an intervening state change returns an identical set.
#[derive(Debug)]
pub struct BlockingRuleEngine {
    page: BlockedPage,
    current: RuleSet,
}

impl BlockingRuleEngine {
    pub fn new(page: BlockedPage) -> Self {
        Self {
            page,
            current: RuleSet::default(),
        }
    }

    pub fn page(&self) -> &BlockedPage {
        &self.page
    }

    /// The most recently computed rule set
    pub fn current(&self) -> &RuleSet {
        &self.current
    }

    pub fn recompute(&mut self, inputs: &BlockingInputs<'_>) -> &RuleSet {
        let rules = self.build(inputs);
        if rules != self.current.rules {
            self.current = RuleSet {
                generation: self.current.generation + 1,
                rules,
            };
            debug!(
                generation = self.current.generation,
                rules = self.current.len(),
                "Rule set changed"
            );
        }
        &self.current
    }

    fn build(&self, inputs: &BlockingInputs<'_>) -> Vec<BlockRule> {
        inputs
            .blocked_domains()
            .into_iter()
            .zip(1u32..)
            .map(|((domain, reason), id)| BlockRule {
                id,
                priority: reason.priority(),
                url_filter: BlockedPage::url_filter(&domain),
                redirect_url: self.page.redirect_url(&domain, reason),
                domain,
                reason,
            })
            .collect()
    }
}
