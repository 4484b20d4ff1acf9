//! Message taxonomy + severity filter (component H).
//!
//! A diagnostic's [`Category`] is a bitmask over three orthogonal axes —
//! severity (`impact_1..impact_4`), accuracy (`bloat`, `suboptimal`), and
//! area (`leb128`, `abbrevs`, the three `die-rel-*` kinds, `die-other`,
//! `strings`, `aranges`, `elf`, `pubnames`, `other`) — plus a standalone
//! `error` escalation bit (spec.md §3/§4.H). Modeled with `bitflags`,
//! matching the bitmask idiom `bitflags` crates in this corpus use for
//! exactly this kind of "several independent yes/no axes" value
//! (`asterism-labs-hadron`'s kernel crates use it the same way).

use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Category: u32 {
        const IMPACT_1 = 1 << 0;
        const IMPACT_2 = 1 << 1;
        const IMPACT_3 = 1 << 2;
        const IMPACT_4 = 1 << 3;

        const BLOAT = 1 << 4;
        const SUBOPTIMAL = 1 << 5;

        const LEB128 = 1 << 6;
        const ABBREVS = 1 << 7;
        const DIE_REL_SIB = 1 << 8;
        const DIE_REL_CHILD = 1 << 9;
        const DIE_REL_REF = 1 << 10;
        const DIE_OTHER = 1 << 11;
        const STRINGS = 1 << 12;
        const ARANGES = 1 << 13;
        const ELF = 1 << 14;
        const PUBNAMES = 1 << 15;
        const OTHER = 1 << 16;

        /// Escalates a message to error status regardless of impact level.
        const ERROR = 1 << 17;
    }
}

impl Category {
    pub const AREA: Category = Category::LEB128
        .union(Category::ABBREVS)
        .union(Category::DIE_REL_SIB)
        .union(Category::DIE_REL_CHILD)
        .union(Category::DIE_REL_REF)
        .union(Category::DIE_OTHER)
        .union(Category::STRINGS)
        .union(Category::ARANGES)
        .union(Category::ELF)
        .union(Category::PUBNAMES)
        .union(Category::OTHER);

    /// `true` iff the reporter should print this message as `error: `
    /// (and count it towards the process exit code) rather than
    /// `warning: ` — spec.md §4.H: "the error bit and impact-4 severity
    /// together imply printed severity error".
    pub fn is_error(self) -> bool {
        self.contains(Category::ERROR) || self.contains(Category::IMPACT_4)
    }
}

/// The accept/reject bitmasks that gate which messages are ever printed
/// or counted (spec.md §4.H). Defaults: accept everything except the
/// `strings` area; reject nothing.
#[derive(Debug, Clone, Copy)]
pub struct Criteria {
    pub accept: Category,
    pub reject: Category,
    /// `-q`/`--quiet`: suppresses the per-file "No errors" summary line
    /// (spec.md §6). Does not affect which messages are printed or counted.
    pub quiet: bool,
}

impl Default for Criteria {
    fn default() -> Self {
        Self {
            accept: Category::AREA - Category::STRINGS,
            reject: Category::empty(),
            quiet: false,
        }
    }
}

impl Criteria {
    pub fn accepts(&self, category: Category) -> bool {
        self.accept.intersects(category) && !self.reject.intersects(category)
    }

    /// `--strict`: include the `strings` area in `accept`.
    pub fn strict(&mut self) {
        self.accept |= Category::STRINGS;
    }

    /// `--gnu`: reject `bloat`-accuracy messages (accepts GNU-produced bloat).
    pub fn gnu(&mut self) {
        self.reject |= Category::BLOAT;
    }

    /// `-i`/`--ignore-missing`: reject `elf`-area messages.
    pub fn ignore_missing(&mut self) {
        self.reject |= Category::ELF;
    }

    /// `-q`/`--quiet`: suppress the per-file "No errors" line.
    pub fn quiet(&mut self) {
        self.quiet = true;
    }
}

/// One positional context field rendered after a message's section name,
/// e.g. `CU 0x10` or `DIE 0x24` (spec.md §6).
#[derive(Debug, Clone, Copy)]
pub struct Context {
    pub label: &'static str,
    pub offset: u64,
}

/// A single structural-integrity diagnostic.
#[derive(Debug, Clone)]
pub struct Message {
    pub category: Category,
    pub section: &'static str,
    pub context: Vec<Context>,
    pub text: String,
}

impl Message {
    pub fn new(section: &'static str, category: Category, text: impl Into<String>) -> Self {
        Self {
            category,
            section,
            context: Vec::new(),
            text: text.into(),
        }
    }

    #[must_use]
    pub fn at(mut self, label: &'static str, offset: u64) -> Self {
        self.context.push(Context { label, offset });
        self
    }

    fn context_string(&self) -> String {
        let mut parts = Vec::with_capacity(self.context.len() + 1);
        parts.push(self.section.to_string());
        for ctx in &self.context {
            parts.push(format!("{} 0x{:x}", ctx.label, ctx.offset));
        }
        parts.join(", ")
    }
}

impl std::fmt::Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {}: {}",
            if self.category.is_error() { "error" } else { "warning" },
            self.context_string(),
            self.text
        )
    }
}

/// Owns the global error counter and the accept/reject masks — the only
/// shared mutable state in the pipeline (spec.md §5).
pub struct Reporter {
    criteria: Criteria,
    error_count: u64,
}

impl Reporter {
    pub fn new(criteria: Criteria) -> Self {
        Self {
            criteria,
            error_count: 0,
        }
    }

    pub fn error_count(&self) -> u64 {
        self.error_count
    }

    /// `-q`/`--quiet`: whether the caller should suppress the per-file
    /// "No errors" summary line.
    pub fn quiet(&self) -> bool {
        self.criteria.quiet
    }

    /// Applies the accept/reject filter, updates the error counter, emits
    /// a `tracing` event, and prints the message's line-oriented form to
    /// stdout (spec.md §6). Rejected messages affect neither the counter
    /// nor the output. `--quiet` only ever suppresses the separate
    /// per-file "No errors" line, never an accepted message.
    pub fn emit(&mut self, message: Message) {
        if !self.criteria.accepts(message.category) {
            return;
        }
        let is_error = message.category.is_error();
        if is_error {
            self.error_count += 1;
            tracing::error!(target: "dwarflint", section = message.section, "{}", message.text);
        } else {
            tracing::warn!(target: "dwarflint", section = message.section, "{}", message.text);
        }
        println!("{message}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_criteria_rejects_strings() {
        let criteria = Criteria::default();
        assert!(!criteria.accepts(Category::STRINGS));
        assert!(criteria.accepts(Category::ABBREVS));
    }

    #[test]
    fn strict_flag_enables_strings() {
        let mut criteria = Criteria::default();
        criteria.strict();
        assert!(criteria.accepts(Category::STRINGS));
    }

    #[test]
    fn gnu_flag_rejects_bloat() {
        let mut criteria = Criteria::default();
        criteria.gnu();
        assert!(!criteria.accepts(Category::ABBREVS | Category::BLOAT));
        assert!(criteria.accepts(Category::ABBREVS | Category::SUBOPTIMAL));
    }

    #[test]
    fn error_bit_and_impact4_both_escalate() {
        assert!((Category::ERROR | Category::OTHER).is_error());
        assert!((Category::IMPACT_4 | Category::OTHER).is_error());
        assert!(!(Category::IMPACT_1 | Category::OTHER).is_error());
    }

    #[test]
    fn rejected_message_does_not_count() {
        let mut reporter = Reporter::new(Criteria::default());
        reporter.emit(Message::new("x", Category::STRINGS | Category::IMPACT_4, "wasted byte"));
        assert_eq!(reporter.error_count(), 0);
    }

    #[test]
    fn accepted_error_increments_counter() {
        let mut reporter = Reporter::new(Criteria::default());
        reporter.emit(Message::new("x", Category::ABBREVS | Category::IMPACT_4, "bad abbrev"));
        assert_eq!(reporter.error_count(), 1);
    }
}
